use clap::Parser;

use super::{ApplicationSubcommands, Cli, Commands, ConfigSubcommands, CropSubcommands};

fn parse(args: &[&str]) -> Cli {
    Cli::parse_from(args)
}

#[test]
fn global_flags_precede_subcommands() {
    let cli = parse(&[
        "croplog",
        "--db",
        "/tmp/state.sqlite",
        "--now",
        "2024-06-30",
        "recommend",
        "--crop",
        "crop-1a2b",
        "--json",
    ]);
    assert_eq!(cli.db, "/tmp/state.sqlite");
    assert_eq!(cli.now.as_deref(), Some("2024-06-30"));
    match cli.command {
        Commands::Recommend(args) => {
            assert_eq!(args.crop.as_deref(), Some("crop-1a2b"));
            assert!(args.json);
        }
        other => panic!("expected Recommend, got {:?}", other),
    }
}

#[test]
fn crop_add_parses_optional_fields() {
    let cli = parse(&[
        "croplog",
        "crop",
        "add",
        "other",
        "--farm",
        "farm-1",
        "--planted",
        "2024-03-01",
        "--area",
        "2.5",
        "--name",
        "Saffron",
        "--harvest",
        "2024-10-01",
    ]);
    match cli.command {
        Commands::Crop(args) => match args.command {
            CropSubcommands::Add(add) => {
                assert_eq!(add.crop_type, "other");
                assert_eq!(add.area, 2.5);
                assert_eq!(add.name.as_deref(), Some("Saffron"));
                assert_eq!(add.harvest.as_deref(), Some("2024-10-01"));
                assert!(add.variety.is_none());
            }
            other => panic!("expected Add, got {:?}", other),
        },
        other => panic!("expected Crop, got {:?}", other),
    }
}

#[test]
fn app_add_uses_type_flag() {
    let cli = parse(&[
        "croplog", "app", "add", "-c", "crop-1", "--type", "fungicide", "-p", "Copper", "-q", "1",
        "-u", "l",
    ]);
    match cli.command {
        Commands::App(args) => match args.command {
            ApplicationSubcommands::Add(add) => {
                assert_eq!(add.treatment_type, "fungicide");
                assert_eq!(add.quantity, 1.0);
                assert!(add.date.is_none());
            }
            other => panic!("expected Add, got {:?}", other),
        },
        other => panic!("expected App, got {:?}", other),
    }
}

#[test]
fn config_get_key_is_optional() {
    let cli = parse(&["croplog", "config", "get"]);
    match cli.command {
        Commands::Config(args) => match args.command {
            ConfigSubcommands::Get(get) => assert!(get.key.is_none()),
            other => panic!("expected Get, got {:?}", other),
        },
        other => panic!("expected Config, got {:?}", other),
    }
}

#[test]
fn missing_required_flags_fail_to_parse() {
    assert!(Cli::try_parse_from(["croplog", "apply", "rec-1"]).is_err());
    assert!(Cli::try_parse_from(["croplog", "farm", "add", "North"]).is_err());
}
