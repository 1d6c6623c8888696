//! Cut guides drawn on top of the card images

use proxy_core::{CardTransform, EXTENDED_GUIDE_OFFSET_MM, Length, Position, Size};

use crate::types::{CrossData, CrossSegment, LineData};

/// Positions closer than this are the same guide
const GUIDE_PRECISION_MM: f32 = 0.01;

/// Crosses at the four corners of a trimmed card
pub fn corner_crosses(card: &CardTransform) -> [CrossData; 4] {
    let rect = card.rect();
    [
        CrossData {
            corner: Position::new(rect.left(), rect.top()),
            segment: CrossSegment::TopLeft,
        },
        CrossData {
            corner: Position::new(rect.right(), rect.top()),
            segment: CrossSegment::TopRight,
        },
        CrossData {
            corner: Position::new(rect.right(), rect.bottom()),
            segment: CrossSegment::BottomRight,
        },
        CrossData {
            corner: Position::new(rect.left(), rect.bottom()),
            segment: CrossSegment::BottomLeft,
        },
    ]
}

/// Distance kept between extended guides and the outermost card edges
pub fn extended_guide_offset(bleed_edge: Length, envelope_bleed_edge: Length) -> Length {
    bleed_edge + envelope_bleed_edge + Length::from_mm(EXTENDED_GUIDE_OFFSET_MM)
}

/// Guides continuing every card edge out to the page border.
///
/// Each distinct edge position gets two segments, one on each side of the
/// card block, stopping `offset` short of the outermost cards.
pub fn extended_guides(cards: &[CardTransform], page_size: Size, offset: Length) -> Vec<LineData> {
    let mut xs: Vec<Length> = Vec::new();
    let mut ys: Vec<Length> = Vec::new();
    for card in cards {
        let rect = card.rect();
        push_unique(&mut xs, rect.left());
        push_unique(&mut xs, rect.right());
        push_unique(&mut ys, rect.top());
        push_unique(&mut ys, rect.bottom());
    }

    let (Some(x_min), Some(x_max)) = (min(&xs), max(&xs)) else {
        return Vec::new();
    };
    let (Some(y_min), Some(y_max)) = (min(&ys), max(&ys)) else {
        return Vec::new();
    };
    let (x_min, x_max) = (x_min - offset, x_max + offset);
    let (y_min, y_max) = (y_min - offset, y_max + offset);

    let mut guides = Vec::with_capacity(2 * (xs.len() + ys.len()));
    for &x in &xs {
        guides.push(LineData::new(
            Position::new(x, y_min),
            Position::new(x, Length::ZERO),
        ));
        guides.push(LineData::new(
            Position::new(x, y_max),
            Position::new(x, page_size.height),
        ));
    }
    for &y in &ys {
        guides.push(LineData::new(
            Position::new(x_min, y),
            Position::new(Length::ZERO, y),
        ));
        guides.push(LineData::new(
            Position::new(x_max, y),
            Position::new(page_size.width, y),
        ));
    }
    guides
}

fn push_unique(values: &mut Vec<Length>, value: Length) {
    if !values
        .iter()
        .any(|v| (v.mm() - value.mm()).abs() < GUIDE_PRECISION_MM)
    {
        values.push(value);
    }
}

fn min(values: &[Length]) -> Option<Length> {
    values.iter().copied().reduce(Length::min)
}

fn max(values: &[Length]) -> Option<Length> {
    values.iter().copied().reduce(Length::max)
}
