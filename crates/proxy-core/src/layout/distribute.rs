//! Distribution of cards onto pages and matching of backside pages

use crate::project::ProjectData;
use crate::types::SizeClass;

use super::{Page, PageImage};

/// Fill pages with the project's visible cards, in input order.
///
/// Each card appears `num` times, hidden cards are skipped. Regular and
/// oversized cards get independent page streams, regular pages first. Every
/// page has exactly `capacity` slots and only the last page of a stream may
/// be partially filled.
pub fn distribute_cards(
    project: &ProjectData,
    regular_capacity: usize,
    oversized_capacity: usize,
) -> Vec<Page> {
    let mut pages = Vec::new();
    for (size_class, capacity) in [
        (SizeClass::Regular, regular_capacity),
        (SizeClass::Oversized, oversized_capacity),
    ] {
        let capacity = capacity.max(1);
        let images = project
            .cards
            .iter()
            .enumerate()
            .filter(|(_, card)| card.size_class(project.oversized_enabled) == size_class)
            .flat_map(|(card_index, card)| {
                let image = PageImage {
                    image: card.name.clone(),
                    card_index,
                    backside_short_edge: card.backside_short_edge,
                };
                std::iter::repeat_n(image, card.printed_copies() as usize)
            });

        let mut current = Page::empty(size_class, capacity);
        let mut filled = 0;
        for image in images {
            current.slots[filled] = Some(image);
            filled += 1;
            if filled == capacity {
                pages.push(std::mem::replace(&mut current, Page::empty(size_class, capacity)));
                filled = 0;
            }
        }
        if filled > 0 {
            pages.push(current);
        }
    }
    log::debug!("Distributed cards onto {} pages", pages.len());
    pages
}

/// Build the backside page of every front page, slot for slot.
///
/// Slots keep their index; mirroring happens when transforms are computed.
/// A slot whose card has no resolvable backside stays blank so both streams
/// keep the same geometry.
pub fn make_backside_pages(project: &ProjectData, front_pages: &[Page]) -> Vec<Page> {
    front_pages
        .iter()
        .map(|page| Page {
            size_class: page.size_class,
            slots: page
                .slots
                .iter()
                .map(|slot| {
                    let front = slot.as_ref()?;
                    let card = project.cards.get(front.card_index)?;
                    let backside = project.resolve_backside(card)?;
                    Some(PageImage {
                        image: backside.to_path_buf(),
                        card_index: front.card_index,
                        backside_short_edge: front.backside_short_edge,
                    })
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardInfo;

    #[test]
    fn test_hidden_cards_are_skipped() {
        let mut project = ProjectData::default();
        let mut hidden = CardInfo::new("hidden.png");
        hidden.hidden = true;
        project.cards.push(hidden);
        project.cards.push(CardInfo::new("shown.png").with_num(2));

        let pages = distribute_cards(&project, 9, 1);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].occupied(), 2);
        assert!(pages[0]
            .slots
            .iter()
            .flatten()
            .all(|slot| slot.card_index == 1));
    }

    #[test]
    fn test_oversized_stream_is_separate() {
        let mut project = ProjectData {
            oversized_enabled: true,
            ..Default::default()
        };
        let mut big = CardInfo::new("big.png");
        big.oversized = true;
        project.cards.push(CardInfo::new("a.png"));
        project.cards.push(big);
        project.cards.push(CardInfo::new("b.png"));

        let pages = distribute_cards(&project, 9, 4);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].size_class, SizeClass::Regular);
        assert_eq!(pages[0].occupied(), 2);
        assert_eq!(pages[1].size_class, SizeClass::Oversized);
        assert_eq!(pages[1].slots.len(), 4);
        assert_eq!(pages[1].occupied(), 1);
    }

    #[test]
    fn test_backside_slots_stay_blank_without_backside() {
        let mut project = ProjectData {
            backside_enabled: true,
            backside_default: None,
            ..Default::default()
        };
        project.cards.push(CardInfo::new("a.png").with_backside("b.png"));
        project.cards.push(CardInfo::new("c.png"));

        let front = distribute_cards(&project, 4, 1);
        let back = make_backside_pages(&project, &front);
        assert_eq!(back.len(), front.len());
        assert_eq!(back[0].slots.len(), 4);
        assert_eq!(back[0].occupied(), 1);
        assert_eq!(
            back[0].slots[0].as_ref().map(|slot| slot.image.as_path()),
            Some(std::path::Path::new("b.png"))
        );
    }
}
