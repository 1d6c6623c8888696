use proxy_core::{Color, CoreError, GuideOptions, Length, Position};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("PDF error: {0}")]
    Pdf(String),
    #[error("PDF error: {0}")]
    Lopdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("No page in progress")]
    NoPage,
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// A straight guide segment, top-left origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineData {
    pub from: Position,
    pub to: Position,
}

impl LineData {
    pub fn new(from: Position, to: Position) -> Self {
        Self { from, to }
    }
}

/// Which card corner a cross sits on; its arms run along the card's edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossSegment {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl CrossSegment {
    /// Unit direction of the arms, y pointing down
    fn direction(self) -> (f32, f32) {
        match self {
            CrossSegment::TopLeft => (1.0, 1.0),
            CrossSegment::TopRight => (-1.0, 1.0),
            CrossSegment::BottomRight => (-1.0, -1.0),
            CrossSegment::BottomLeft => (1.0, -1.0),
        }
    }
}

/// A corner guide
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossData {
    pub corner: Position,
    pub segment: CrossSegment,
}

impl CrossData {
    /// Horizontal and vertical arm of the cross
    pub fn lines(&self, length: Length) -> [LineData; 2] {
        let (dx, dy) = self.segment.direction();
        let horizontal = Position::new(self.corner.x + length * dx, self.corner.y);
        let vertical = Position::new(self.corner.x, self.corner.y + length * dy);
        [
            LineData::new(self.corner, horizontal),
            LineData::new(self.corner, vertical),
        ]
    }
}

/// Two-color dashed stroke: a solid base with contrasting dashes on top
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuideStyle {
    pub thickness: Length,
    pub color_a: Color,
    pub color_b: Color,
    /// Length of each dash and gap
    pub dash: Length,
    pub cross_length: Length,
}

impl GuideStyle {
    pub fn from_options(options: &GuideOptions) -> Self {
        Self {
            thickness: options.thickness,
            color_a: options.color_a,
            color_b: options.color_b,
            dash: options.cross_length / 4.0,
            cross_length: options.cross_length,
        }
    }
}

impl Default for GuideStyle {
    fn default() -> Self {
        Self::from_options(&GuideOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_arms_follow_card_edges() {
        let cross = CrossData {
            corner: Position::from_mm(10.0, 20.0),
            segment: CrossSegment::BottomRight,
        };
        let [horizontal, vertical] = cross.lines(Length::from_mm(2.0));
        assert_eq!(horizontal.to, Position::from_mm(8.0, 20.0));
        assert_eq!(vertical.to, Position::from_mm(10.0, 18.0));
    }
}
