use std::path::{Path, PathBuf};

use proxy_core::*;

fn project(names: &[&str]) -> ProjectData {
    ProjectData {
        cards: names.iter().map(|name| CardInfo::new(*name)).collect(),
        ..Default::default()
    }
}

#[test]
fn test_project_defaults_validate() {
    assert!(ProjectData::default().validate().is_ok());
    assert!(project(&["a.png", "b.png"]).validate().is_ok());
}

#[test]
fn test_duplicate_cards_are_rejected() {
    let result = project(&["a.png", "a.png"]).validate();
    match result {
        Err(CoreError::Config(message)) => assert!(message.contains("a.png")),
        other => panic!("Expected Config error, got {other:?}"),
    }
}

#[test]
fn test_num_zero_requires_hidden() {
    let mut project = project(&["a.png"]);
    project.cards[0].num = 0;
    assert!(project.validate().is_err());
    project.cards[0].hidden = true;
    assert!(project.validate().is_ok());
}

#[test]
fn test_unknown_backside_is_rejected() {
    let mut project = project(&["a.png"]);
    project.cards[0].backside = Some(PathBuf::from("ghost.png"));
    assert!(project.validate().is_err());

    project.cards.push(CardInfo::new("ghost.png"));
    assert!(project.validate().is_ok());
}

#[test]
fn test_auto_assign_backsides() {
    let mut project = project(&["forest.png", "__back_forest.png", "island.png"]);
    let assigned = project
        .auto_assign_backsides(DEFAULT_BACKSIDE_PATTERN)
        .unwrap();
    assert_eq!(assigned, 1);

    let forest = project.card(Path::new("forest.png")).unwrap();
    assert_eq!(forest.backside, Some(PathBuf::from("__back_forest.png")));
    assert!(forest.backside_auto_assigned);
    assert!(project.card(Path::new("__back_forest.png")).unwrap().hidden);
    assert_eq!(project.card(Path::new("island.png")).unwrap().backside, None);
    assert!(project.validate().is_ok());
}

#[test]
fn test_auto_assign_keeps_explicit_backsides() {
    let mut project = project(&["forest.png", "__back_forest.png", "custom.png"]);
    project.cards[0].backside = Some(PathBuf::from("custom.png"));
    assert_eq!(project.auto_assign_backsides("__back_$").unwrap(), 0);
    assert_eq!(
        project.cards[0].backside,
        Some(PathBuf::from("custom.png"))
    );
}

#[test]
fn test_auto_assign_pattern_validation() {
    let mut project = project(&["a.png"]);
    assert!(project.auto_assign_backsides("no_wildcard").is_err());
    assert!(project.auto_assign_backsides("$_$").is_err());
    assert!(project.auto_assign_backsides("$").is_err());
}

#[test]
fn test_backside_images_are_distinct() {
    let mut project = project(&["a.png", "b.png", "c.png"]);
    project.backside_enabled = true;
    project.cards[0].backside = Some(PathBuf::from("c.png"));
    let backsides = project.backside_images();
    assert_eq!(
        backsides,
        vec![Path::new("c.png"), Path::new(DEFAULT_BACKSIDE_NAME)]
    );
}

#[test]
fn test_envelope_must_fit_in_source_bleed() {
    let mut project = project(&["a.png"]);
    project.bleed_edge = Length::from_mm(1.0);
    project.envelope_bleed_edge = Length::from_mm(2.0);
    assert!(project.validate().is_ok());
    assert_eq!(project.printed_bleed(), Length::from_mm(3.0));

    project.envelope_bleed_edge = Length::from_mm(3.0);
    assert!(matches!(project.validate(), Err(CoreError::Config(_))));
}
