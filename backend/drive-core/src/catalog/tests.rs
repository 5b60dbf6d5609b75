use super::*;
use test_log::test;

fn catalog() -> ImageCatalog {
    ImageCatalog::new(CatalogConfig::default()).unwrap()
}

#[test]
fn names_are_zero_padded() {
    let mut catalog = catalog();
    assert_eq!(catalog.current_name(), "disc000.img");

    for _ in 0..12 {
        catalog.advance();
    }
    assert_eq!(catalog.current_name(), "disc012.img");

    catalog.reset();
    assert_eq!(catalog.current_number(), 0);
}

#[test]
fn parse_accepts_any_width_and_case() {
    let catalog = catalog();
    assert_eq!(catalog.parse_number("disc000.img"), Some(0));
    assert_eq!(catalog.parse_number("DISC7.IMG"), Some(7));
    assert_eq!(catalog.parse_number("disc0042.img"), Some(42));

    assert_eq!(catalog.parse_number("disc.img"), None);
    assert_eq!(catalog.parse_number("disc001.img.bak"), None);
    assert_eq!(catalog.parse_number("mydisc001.img"), None);
    assert_eq!(catalog.parse_number("disc0x1.img"), None);
}

#[test]
fn prefix_and_suffix_are_literal() {
    let config = CatalogConfig {
        name_prefix: "game(".into(),
        name_suffix: ").gd+".into(),
        number_width: 2,
        first_number: 1,
    };
    let catalog = ImageCatalog::new(config).unwrap();

    assert_eq!(catalog.current_name(), "game(01).gd+");
    assert!(catalog.matches_current("game(1).gd+"));
    assert_eq!(catalog.parse_number("gameX1).gdd"), None);
}
