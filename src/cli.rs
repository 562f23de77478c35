use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, CommandFactory, Parser, Subcommand};

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

pub fn styled_command() -> clap::Command {
    Cli::command()
}

#[derive(Debug, Parser)]
#[command(name = "croplog")]
#[command(bin_name = "croplog")]
#[command(version)]
#[command(about = "A local farm activity recorder with treatment recommendations")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'd',
        long,
        env = "CROPLOG_DB_PATH",
        default_value = ".croplog/state.sqlite",
        help = "Path to the local SQLite database."
    )]
    pub db: String,

    #[arg(
        long,
        env = "CROPLOG_NOW",
        help = "Evaluate as of this instant (YYYY-MM-DD or RFC3339). Defaults to now."
    )]
    pub now: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Manage farms.")]
    Farm(FarmArgs),
    #[command(about = "Manage crops.")]
    Crop(CropArgs),
    #[command(about = "Record and manage treatment applications.")]
    App(ApplicationArgs),
    #[command(about = "Infer the growth stage for a planting date.")]
    Stage(StageArgs),
    #[command(about = "List treatment recommendations, highest priority first.")]
    Recommend(RecommendArgs),
    #[command(about = "Record a recommended treatment as applied today.")]
    Apply(ApplyArgs),
    #[command(about = "Show counts, urgent tasks, and crop overview.")]
    Dashboard(JsonArgs),
    #[command(about = "Show the activity log, newest first.")]
    Activity(ActivityArgs),
    #[command(about = "Show application statistics.")]
    Analytics(AnalyticsArgs),
    #[command(about = "Show applications grouped by month.")]
    Calendar(CalendarArgs),
    #[command(about = "Show the built-in crop knowledge base.")]
    Knowledge(KnowledgeArgs),
    #[command(about = "Read or change persistent settings.")]
    Config(ConfigArgs),
    #[command(about = "Generate or install shell completions.")]
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct JsonArgs {
    #[arg(long, help = "Render JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct FarmArgs {
    #[command(subcommand)]
    pub command: FarmSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum FarmSubcommands {
    #[command(about = "Add a farm.")]
    Add(FarmAddArgs),
    #[command(about = "Rename a farm.")]
    Rename(RenameArgs),
    #[command(about = "Delete a farm with its crops and their applications.")]
    Rm(RemoveArgs),
    #[command(about = "List farms.")]
    Ls(JsonArgs),
}

#[derive(Debug, Args)]
pub struct FarmAddArgs {
    #[arg(help = "Farm name.")]
    pub name: String,

    #[arg(short = 'c', long, help = "External farm code, unique per database.")]
    pub code: String,

    #[arg(short = 'l', long, help = "Location description.")]
    pub location: Option<String>,

    #[arg(short = 's', long, help = "Size in acres.")]
    pub size: Option<f64>,

    #[arg(long, help = "Soil type.")]
    pub soil: Option<String>,
}

#[derive(Debug, Args)]
pub struct RenameArgs {
    #[arg(help = "Record id.")]
    pub id: String,
    #[arg(help = "New name.")]
    pub name: String,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    #[arg(help = "Record id.")]
    pub id: String,
}

#[derive(Debug, Args)]
pub struct CropArgs {
    #[command(subcommand)]
    pub command: CropSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum CropSubcommands {
    #[command(about = "Add a crop to a farm.")]
    Add(CropAddArgs),
    #[command(about = "Rename a crop.")]
    Rename(RenameArgs),
    #[command(about = "Delete a crop and its applications.")]
    Rm(RemoveArgs),
    #[command(about = "List crops.")]
    Ls(CropListArgs),
    #[command(about = "Show one crop with its applications and recommendations.")]
    Show(CropShowArgs),
}

#[derive(Debug, Args)]
pub struct CropAddArgs {
    #[arg(help = "Crop type: a knowledge base id (wheat, corn, rice, tomatoes) or 'other'.")]
    pub crop_type: String,

    #[arg(short = 'f', long, help = "Owning farm id.")]
    pub farm: String,

    #[arg(short = 'p', long, help = "Planting date (YYYY-MM-DD).")]
    pub planted: String,

    #[arg(short = 'a', long, help = "Area in acres.")]
    pub area: f64,

    #[arg(short = 'n', long, help = "Crop name; required for type 'other'.")]
    pub name: Option<String>,

    #[arg(short = 'v', long, help = "Variety.")]
    pub variety: Option<String>,

    #[arg(long, help = "Expected harvest date (YYYY-MM-DD).")]
    pub harvest: Option<String>,

    #[arg(long, help = "Field identifier.")]
    pub field: Option<String>,

    #[arg(long, help = "Free-form notes.")]
    pub notes: Option<String>,
}

#[derive(Debug, Args)]
pub struct CropListArgs {
    #[arg(short = 'f', long, help = "Only crops of this farm.")]
    pub farm: Option<String>,

    #[arg(long, help = "Render JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CropShowArgs {
    #[arg(help = "Crop id.")]
    pub id: String,

    #[arg(long, help = "Render JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ApplicationArgs {
    #[command(subcommand)]
    pub command: ApplicationSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum ApplicationSubcommands {
    #[command(about = "Record a treatment application.")]
    Add(ApplicationAddArgs),
    #[command(about = "Rename an application's product.")]
    Rename(RenameArgs),
    #[command(about = "Delete an application.")]
    Rm(RemoveArgs),
    #[command(about = "List applications.")]
    Ls(ApplicationListArgs),
}

#[derive(Debug, Args)]
pub struct ApplicationAddArgs {
    #[arg(short = 'c', long, help = "Crop id.")]
    pub crop: String,

    #[arg(
        short = 't',
        long = "type",
        help = "Treatment type: fertilizer, pesticide, herbicide, fungicide, other."
    )]
    pub treatment_type: String,

    #[arg(short = 'p', long, help = "Product name.")]
    pub product: String,

    #[arg(short = 'q', long, help = "Quantity applied.")]
    pub quantity: f64,

    #[arg(short = 'u', long, help = "Unit of the quantity.")]
    pub unit: String,

    #[arg(long, help = "Application date (YYYY-MM-DD). Defaults to today.")]
    pub date: Option<String>,

    #[arg(long, help = "Growth stage label at application time.")]
    pub stage: Option<String>,

    #[arg(long, help = "Application method.")]
    pub method: Option<String>,

    #[arg(long, help = "Weather conditions.")]
    pub weather: Option<String>,

    #[arg(long, help = "Purpose of the treatment.")]
    pub purpose: Option<String>,

    #[arg(long, help = "Free-form notes.")]
    pub notes: Option<String>,
}

#[derive(Debug, Args)]
pub struct ApplicationListArgs {
    #[arg(short = 'c', long, help = "Only applications of this crop.")]
    pub crop: Option<String>,

    #[arg(long, help = "Render JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct StageArgs {
    #[arg(help = "Planting date (YYYY-MM-DD or RFC3339).")]
    pub planted: String,

    #[arg(long, help = "Render JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct RecommendArgs {
    #[arg(short = 'c', long, help = "Only recommendations for this crop.")]
    pub crop: Option<String>,

    #[arg(long, help = "Render JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    #[arg(help = "Recommendation id as printed by `croplog recommend`.")]
    pub id: String,

    #[arg(short = 'q', long, help = "Quantity applied.")]
    pub quantity: f64,

    #[arg(short = 'u', long, help = "Unit of the quantity.")]
    pub unit: String,
}

#[derive(Debug, Args)]
pub struct ActivityArgs {
    #[arg(short = 'n', long, help = "Show at most this many entries.")]
    pub limit: Option<usize>,

    #[arg(long, help = "Render JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct AnalyticsArgs {
    #[arg(
        short = 'y',
        long,
        help = "Year for the monthly breakdown. Defaults to the current year."
    )]
    pub year: Option<i32>,

    #[arg(long, help = "Render JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CalendarArgs {
    #[arg(short = 'y', long, help = "Calendar year. Defaults to the current year.")]
    pub year: Option<i32>,

    #[arg(short = 'c', long, help = "Only applications of this crop.")]
    pub crop: Option<String>,

    #[arg(long, help = "Render JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct KnowledgeArgs {
    #[arg(help = "Only this crop type.")]
    pub crop_type: Option<String>,

    #[arg(long, help = "Render JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommands {
    #[command(about = "Show one setting, or all settings and storage usage.")]
    Get(ConfigGetArgs),
    #[command(about = "Change a setting.")]
    Set(ConfigSetArgs),
}

#[derive(Debug, Args)]
pub struct ConfigGetArgs {
    #[arg(help = "Setting key: activity_limit or urgent_limit.")]
    pub key: Option<String>,

    #[arg(long, help = "Render JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ConfigSetArgs {
    #[arg(help = "Setting key: activity_limit or urgent_limit.")]
    pub key: String,
    #[arg(help = "New value.")]
    pub value: String,
}

#[derive(Debug, Args)]
#[command(about = "Generate or install shell completions.")]
pub struct CompletionsArgs {
    #[arg(help = "Shell name (bash, zsh, fish). Auto-detected if omitted.")]
    pub shell: Option<String>,

    #[arg(
        short = 'i',
        long = "install",
        help = "Write completions to the canonical path for the shell."
    )]
    pub install: bool,
}

#[cfg(test)]
mod tests;
