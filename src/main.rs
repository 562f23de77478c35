mod activity;
mod analytics;
mod app;
mod cli;
mod completions;
mod db;
mod domain;
mod knowledge;
mod recommend;
mod record_id;
mod settings;
mod store;
mod ui;

use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CROPLOG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(err) => eprintln!("error: json serialization failed: {err}"),
    }
}

fn run() -> Result<(), app::AppError> {
    use clap::Parser;
    use cli::Commands;
    use domain::dates::{format_day, parse_day, parse_instant};
    use domain::stage::{days_since_planting, infer_stage};

    let cli = cli::Cli::parse();
    let now = match cli.now.as_deref() {
        Some(raw) => parse_instant(raw)?,
        None => time::OffsetDateTime::now_utc(),
    };
    tracing::debug!(db = %cli.db, now = %domain::dates::format_rfc3339(now), "starting");

    match &cli.command {
        Commands::Completions(args) => {
            return completions::run_completions_command(args.shell.as_deref(), args.install);
        }
        Commands::Stage(args) => {
            let planted = parse_day(&args.planted)?;
            let days = days_since_planting(planted, now);
            let stage = infer_stage(planted, now);
            if args.json {
                print_json(&serde_json::json!({
                    "planting_date": format_day(planted),
                    "days_since_planting": days,
                    "stage": stage,
                }));
            } else {
                println!("{} ({} day(s) since planting)", stage, days);
            }
            return Ok(());
        }
        Commands::Knowledge(args) => {
            let knowledge = knowledge::KnowledgeBase::load()?;
            let selected = match args.crop_type.as_deref() {
                Some(crop_type) => {
                    let crop = knowledge.get(crop_type).ok_or_else(|| {
                        app::AppError::InvalidArgument(format!(
                            "unknown crop type '{}'; expected one of: {}",
                            crop_type,
                            knowledge.crop_types().join(", ")
                        ))
                    })?;
                    vec![crop]
                }
                None => knowledge.crops().iter().collect(),
            };
            if args.json {
                print_json(&selected);
            } else {
                ui::print_knowledge(&selected);
            }
            return Ok(());
        }
        _ => {}
    }

    let mut app = app::App::open(&cli.db, now)?;

    match cli.command {
        Commands::Farm(args) => run_farm(&mut app, args.command)?,
        Commands::Crop(args) => run_crop(&mut app, args.command)?,
        Commands::App(args) => run_application(&mut app, args.command)?,
        Commands::Recommend(args) => {
            let feed = app.recommendations(args.crop.as_deref())?;
            if args.json {
                print_json(&feed);
            } else {
                ui::print_feed(&feed);
            }
        }
        Commands::Apply(args) => {
            let application = app.apply_recommendation(&args.id, args.quantity, &args.unit)?;
            let palette = ui::Palette::auto();
            println!(
                "applied {} {} {} {}",
                palette.id(&application.id),
                application.product_name,
                application.quantity,
                application.unit
            );
        }
        Commands::Dashboard(args) => {
            let board = app.dashboard()?;
            if args.json {
                print_json(&board);
            } else {
                ui::print_dashboard(&board);
            }
        }
        Commands::Activity(args) => {
            let entries = app.activities(args.limit);
            if args.json {
                print_json(&entries);
            } else {
                ui::print_activities(entries);
            }
        }
        Commands::Analytics(args) => {
            let report = app.analytics(args.year);
            if args.json {
                print_json(&report);
            } else {
                ui::print_analytics(&report);
            }
        }
        Commands::Calendar(args) => {
            let year = args.year.unwrap_or_else(|| app.now().year());
            let months = app.calendar(Some(year), args.crop.as_deref())?;
            if args.json {
                print_json(&months);
            } else {
                ui::print_calendar(year, &months);
            }
        }
        Commands::Config(args) => run_config(&app, args.command)?,
        Commands::Completions(_) | Commands::Stage(_) | Commands::Knowledge(_) => {}
    }

    Ok(())
}

fn run_farm(app: &mut app::App, command: cli::FarmSubcommands) -> Result<(), app::AppError> {
    use cli::FarmSubcommands;
    use domain::records::NewFarm;

    let palette = ui::Palette::auto();
    match command {
        FarmSubcommands::Add(args) => {
            let farm = app.add_farm(NewFarm {
                name: args.name,
                farm_code: args.code,
                location: args.location,
                size: args.size,
                soil_type: args.soil,
            })?;
            println!("created {} {}", palette.id(&farm.id), farm.name);
        }
        FarmSubcommands::Rename(args) => {
            let farm = app.rename_farm(&args.id, &args.name)?;
            println!("renamed {} -> {}", palette.id(&farm.id), farm.name);
        }
        FarmSubcommands::Rm(args) => {
            let report = app.delete_farm(&args.id)?;
            println!(
                "deleted {} farm, {} crop(s), {} application(s)",
                report.farms, report.crops, report.applications
            );
        }
        FarmSubcommands::Ls(args) => {
            if args.json {
                print_json(&app.farms());
            } else {
                ui::print_farms(app.farms());
            }
        }
    }
    Ok(())
}

fn run_crop(app: &mut app::App, command: cli::CropSubcommands) -> Result<(), app::AppError> {
    use cli::CropSubcommands;
    use domain::records::NewCrop;

    let palette = ui::Palette::auto();
    match command {
        CropSubcommands::Add(args) => {
            let crop = app.add_crop(NewCrop {
                crop_type: args.crop_type,
                custom_name: args.name,
                variety: args.variety,
                farm_id: args.farm,
                planting_date: args.planted,
                harvest_date: args.harvest,
                area: args.area,
                field_id: args.field,
                notes: args.notes,
            })?;
            println!("created {} {}", palette.id(&crop.id), crop.name);
        }
        CropSubcommands::Rename(args) => {
            let crop = app.rename_crop(&args.id, &args.name)?;
            println!("renamed {} -> {}", palette.id(&crop.id), crop.name);
        }
        CropSubcommands::Rm(args) => {
            let report = app.delete_crop(&args.id)?;
            println!(
                "deleted {} crop, {} application(s)",
                report.crops, report.applications
            );
        }
        CropSubcommands::Ls(args) => {
            let crops = app.crops(args.farm.as_deref());
            if args.json {
                print_json(&crops);
            } else {
                ui::print_crops(&crops);
            }
        }
        CropSubcommands::Show(args) => {
            let detail = app.crop_detail(&args.id)?;
            if args.json {
                print_json(&detail);
            } else {
                ui::print_crop_detail(&detail);
            }
        }
    }
    Ok(())
}

fn run_application(
    app: &mut app::App,
    command: cli::ApplicationSubcommands,
) -> Result<(), app::AppError> {
    use cli::ApplicationSubcommands;
    use domain::dates::format_day;
    use domain::records::NewApplication;
    use domain::treatment::TreatmentType;

    let palette = ui::Palette::auto();
    match command {
        ApplicationSubcommands::Add(args) => {
            let treatment_type = args.treatment_type.parse::<TreatmentType>()?;
            let date = args
                .date
                .unwrap_or_else(|| format_day(app.now().date()));
            let application = app.add_application(NewApplication {
                crop_id: args.crop,
                treatment_type,
                product_name: args.product,
                quantity: args.quantity,
                unit: args.unit,
                date,
                growth_stage: args.stage,
                method: args.method,
                weather: args.weather,
                purpose: args.purpose,
                notes: args.notes,
            })?;
            println!(
                "recorded {} {} on {}",
                palette.id(&application.id),
                application.product_name,
                application.date
            );
        }
        ApplicationSubcommands::Rename(args) => {
            let application = app.rename_application(&args.id, &args.name)?;
            println!(
                "renamed {} -> {}",
                palette.id(&application.id),
                application.product_name
            );
        }
        ApplicationSubcommands::Rm(args) => {
            let application = app.delete_application(&args.id)?;
            println!(
                "deleted {} {}",
                palette.id(&application.id),
                application.product_name
            );
        }
        ApplicationSubcommands::Ls(args) => {
            let applications = app.applications(args.crop.as_deref());
            if args.json {
                print_json(&applications);
            } else {
                ui::print_applications(&applications);
            }
        }
    }
    Ok(())
}

fn run_config(app: &app::App, command: cli::ConfigSubcommands) -> Result<(), app::AppError> {
    use cli::ConfigSubcommands;
    use settings::Setting;

    match command {
        ConfigSubcommands::Get(args) => match args.key.as_deref() {
            Some(key) => {
                let setting = key.parse::<Setting>()?;
                let value = app.setting(setting)?;
                if args.json {
                    let mut entry = serde_json::Map::new();
                    entry.insert(setting.key().to_string(), serde_json::json!(value));
                    print_json(&entry);
                } else {
                    println!("{value}");
                }
            }
            None => {
                let mut values = Vec::with_capacity(Setting::ALL.len());
                for setting in Setting::ALL {
                    values.push((setting.key(), app.setting(setting)?));
                }
                let stats = app.collection_stats()?;
                if args.json {
                    let settings = values
                        .iter()
                        .map(|(key, value)| (key.to_string(), serde_json::json!(value)))
                        .collect::<serde_json::Map<_, _>>();
                    print_json(&serde_json::json!({
                        "settings": settings,
                        "collections": stats,
                    }));
                } else {
                    ui::print_settings(&values, &stats);
                }
            }
        },
        ConfigSubcommands::Set(args) => {
            let setting = args.key.parse::<Setting>()?;
            let value = app.set_setting(setting, &args.value)?;
            println!("{} = {}", setting, value);
        }
    }
    Ok(())
}
