mod backend;
mod generate;
mod guides;
mod lopdf_backend;
mod printpdf_backend;
mod raster_backend;
mod svg;
mod types;

pub use backend::{DocumentBackend, create_document, output_path};
pub use generate::{GenerationOutput, generate, generate_documents};
pub use guides::{corner_crosses, extended_guide_offset, extended_guides};
pub use lopdf_backend::LoPdfDocument;
pub use printpdf_backend::PrintPdfDocument;
pub use raster_backend::RasterDocument;
pub use svg::{cut_guides_svg, write_cut_guides};
pub use types::*;
