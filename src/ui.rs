use std::io::{self, IsTerminal};

use crate::analytics::{Analytics, CalendarMonth, CropOverview, Dashboard, LabelCount};
use crate::app::CropDetail;
use crate::db::CollectionStat;
use crate::domain::records::{Activity, Application, Crop, Farm};
use crate::knowledge::CropKnowledge;
use crate::recommend::{Priority, Recommendation, RecommendationFeed};

pub fn print_farms(farms: &[Farm]) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Farms"));
    if farms.is_empty() {
        println!("{}", palette.dim("no farms recorded"));
        return;
    }
    for farm in farms {
        let mut line = format!(
            "{} {} {}",
            palette.id(&farm.id),
            farm.name,
            palette.dim(&format!("[{}]", farm.farm_code))
        );
        if !farm.location.is_empty() {
            line.push_str(&format!(" {}", farm.location));
        }
        if farm.size > 0.0 {
            line.push_str(&format!(" {} acres", farm.size));
        }
        println!("{line}");
    }
    println!("{}", palette.dim(&format!("{} farm(s)", farms.len())));
}

pub fn print_crops(crops: &[&Crop]) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Crops"));
    if crops.is_empty() {
        println!("{}", palette.dim("no crops recorded"));
        return;
    }
    for crop in crops {
        println!("{}", format_crop_row(crop, &palette));
    }
    println!("{}", palette.dim(&format!("{} crop(s)", crops.len())));
}

fn format_crop_row(crop: &Crop, palette: &Palette) -> String {
    let mut line = format!(
        "{} {} {} planted {} {} acres",
        palette.id(&crop.id),
        crop.name,
        palette.label(&crop.crop_type),
        crop.planting_date,
        crop.area
    );
    if !crop.variety.is_empty() {
        line.push_str(&format!(" variety={}", crop.variety));
    }
    if let Some(harvest) = crop.harvest_date.as_deref() {
        line.push_str(&format!(" harvest={harvest}"));
    }
    line
}

pub fn print_applications(applications: &[&Application]) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Applications"));
    if applications.is_empty() {
        println!("{}", palette.dim("no applications recorded"));
        return;
    }
    for application in applications {
        println!("{}", format_application_row(application, &palette));
    }
    println!(
        "{}",
        palette.dim(&format!("{} application(s)", applications.len()))
    );
}

fn format_application_row(application: &Application, palette: &Palette) -> String {
    let mut line = format!(
        "{} {} {} {} {} {}",
        palette.id(&application.id),
        application.date,
        palette.label(application.treatment_type.as_str()),
        application.product_name,
        application.quantity,
        application.unit
    );
    if let Some(stage) = application.growth_stage.as_deref() {
        line.push_str(&palette.dim(&format!(" @{stage}")));
    }
    line
}

pub fn print_crop_detail(detail: &CropDetail) {
    let palette = Palette::auto();
    let crop = &detail.crop;
    println!(
        "{} {} {}",
        detail.icon,
        palette.heading(&crop.name),
        palette.id(&crop.id)
    );
    println!("farm: {}", detail.farm_name);
    println!("{}", format_crop_row(crop, &palette));
    if !crop.notes.is_empty() {
        println!("notes: {}", crop.notes);
    }
    println!();
    let applications = detail.applications.iter().collect::<Vec<_>>();
    print_applications(&applications);
    println!();
    print_recommendations(&detail.recommendations, &palette);
}

pub fn print_feed(feed: &RecommendationFeed) {
    let palette = Palette::auto();
    print_recommendations(&feed.items, &palette);
    for failure in &feed.failures {
        println!(
            "{}",
            palette.warn(&format!(
                "skipped {} ({}): {}",
                failure.crop_name, failure.crop_id, failure.error
            ))
        );
    }
}

fn print_recommendations(items: &[Recommendation], palette: &Palette) {
    println!("{}", palette.heading("Recommendations"));
    if items.is_empty() {
        println!("{}", palette.dim("nothing to do"));
        return;
    }
    for item in items {
        println!(
            "{} {} {} {}",
            palette.priority(item.priority),
            item.crop_icon,
            item.title,
            palette.dim(&format!("({})", item.farm_name))
        );
        println!("    {}", item.description);
        println!(
            "    {}",
            palette.dim(&format!("due {}  id {}", item.due_date, item.id))
        );
    }
    println!(
        "{}",
        palette.dim(&format!("{} recommendation(s)", items.len()))
    );
}

pub fn print_dashboard(board: &Dashboard) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Dashboard"));
    println!("crops:                    {}", board.total_crops);
    println!("applications this month:  {}", board.applications_this_month);
    println!("upcoming tasks:           {}", board.upcoming_tasks);
    println!("varieties:                {}", board.unique_varieties);
    println!();
    println!("{}", palette.heading("Today"));
    if board.urgent.is_empty() {
        println!("{}", palette.dim("no urgent tasks"));
    }
    for item in &board.urgent {
        println!("{} {} {}", item.crop_icon, item.title, palette.dim(&item.id));
    }
    println!();
    println!("{}", palette.heading("Crops"));
    if board.crops.is_empty() {
        println!("{}", palette.dim("no crops recorded"));
    }
    for overview in &board.crops {
        println!("{}", format_overview_row(overview, &palette));
    }
}

fn format_overview_row(overview: &CropOverview, palette: &Palette) -> String {
    let stage = overview
        .stage
        .map_or("unknown", |stage| stage.as_str())
        .to_string();
    let mut line = format!(
        "{} {} {} {} {} application(s)",
        overview.icon,
        overview.name,
        palette.dim(&overview.farm_name),
        palette.label(&stage),
        overview.applications
    );
    if let Some(days) = overview.days_to_harvest {
        line.push_str(&format!(" harvest in {days} day(s)"));
    }
    line
}

pub fn print_activities(entries: &[Activity]) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Activity"));
    if entries.is_empty() {
        println!("{}", palette.dim("no activity yet"));
        return;
    }
    for entry in entries {
        println!("{} {}", palette.dim(&entry.occurred_at), entry.message);
    }
}

pub fn print_analytics(report: &Analytics) {
    let palette = Palette::auto();
    let summary = &report.summary;
    println!("{}", palette.heading("Summary"));
    println!(
        "crops: {} ({} active)",
        summary.total_crops, summary.active_crops
    );
    println!(
        "applications: {} ({} per crop, {} this month)",
        summary.total_applications,
        summary.average_applications_per_crop,
        summary.applications_this_month
    );
    match summary.most_used_type {
        Some(kind) => println!("most used: {} ({})", kind, summary.most_used_count),
        None => println!("most used: none"),
    }
    println!("varieties: {}", summary.unique_varieties);
    println!("upcoming tasks: {}", summary.upcoming_tasks);
    println!("data quality: {}%", summary.data_quality_score);

    print_counts(&palette, "By crop", &report.by_crop);
    print_counts(&palette, &format!("By month ({})", report.year), &report.by_month);
    print_counts(&palette, "By growth stage", &report.by_stage);
}

fn print_counts(palette: &Palette, title: &str, counts: &[LabelCount]) {
    println!();
    println!("{}", palette.heading(title));
    if counts.is_empty() {
        println!("{}", palette.dim("no data"));
    }
    for entry in counts {
        println!("{:<12} {}", entry.label, entry.count);
    }
}

pub fn print_calendar(year: i32, months: &[CalendarMonth]) {
    let palette = Palette::auto();
    for month in months {
        println!("{}", palette.heading(&format!("{} {}", month.month, year)));
        if month.entries.is_empty() {
            println!("{}", palette.dim("  no applications"));
        }
        for entry in &month.entries {
            println!(
                "  {} - {} {} {} {}",
                entry.date,
                entry.product_name,
                entry.crop_icon,
                entry.crop_name,
                palette.label(entry.treatment_type.as_str())
            );
        }
    }
}

pub fn print_knowledge(crops: &[&CropKnowledge]) {
    let palette = Palette::auto();
    for crop in crops {
        println!(
            "{} {} {}",
            crop.icon,
            palette.heading(&crop.name),
            palette.id(&crop.id)
        );
        println!("  stages: {}", crop.stages.join(" > "));
        for rule in &crop.rules {
            println!(
                "  {} {} {} - {} ({})",
                palette.label(&rule.stage),
                rule.treatment_type,
                rule.product,
                rule.purpose,
                palette.dim(&rule.timing)
            );
        }
    }
}

pub fn print_settings(settings: &[(&str, usize)], stats: &[CollectionStat]) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Settings"));
    for (key, value) in settings {
        println!("{key} = {value}");
    }
    println!();
    println!("{}", palette.heading("Storage"));
    for stat in stats {
        let written = stat.updated_at.as_deref().unwrap_or("never written");
        println!(
            "{:<16} {:>8} bytes {}",
            stat.key,
            stat.bytes,
            palette.dim(written)
        );
    }
}

pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn auto() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    pub fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    pub fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    pub fn id(&self, text: &str) -> String {
        self.paint("1;94", text)
    }

    fn label(&self, text: &str) -> String {
        self.paint("35", &format!("({text})"))
    }

    fn warn(&self, text: &str) -> String {
        self.paint("33", text)
    }

    fn priority(&self, priority: Priority) -> String {
        let upper = priority.as_str().to_ascii_uppercase();
        self.paint(priority_color_code(priority), &format!("[{upper}]"))
    }
}

fn priority_color_code(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "31",
        Priority::Medium => "33",
        Priority::Low => "32",
    }
}

#[cfg(test)]
mod tests {
    use super::{format_application_row, format_crop_row, Palette};
    use crate::domain::records::{Application, Crop};
    use crate::domain::treatment::TreatmentType;

    fn plain() -> Palette {
        Palette { enabled: false }
    }

    #[test]
    fn crop_row_includes_optional_fields_when_present() {
        let mut crop = Crop {
            id: "crop-1a2b".to_string(),
            crop_type: "corn".to_string(),
            name: "Corn".to_string(),
            variety: String::new(),
            farm_id: "farm-1".to_string(),
            planting_date: "2024-06-01".to_string(),
            harvest_date: None,
            area: 2.5,
            field_id: None,
            notes: String::new(),
            status: "Active".to_string(),
            created_at: "2024-06-01T00:00:00Z".to_string(),
        };
        assert_eq!(
            format_crop_row(&crop, &plain()),
            "crop-1a2b Corn (corn) planted 2024-06-01 2.5 acres"
        );
        crop.variety = "Sweet".to_string();
        crop.harvest_date = Some("2024-09-01".to_string());
        assert_eq!(
            format_crop_row(&crop, &plain()),
            "crop-1a2b Corn (corn) planted 2024-06-01 2.5 acres variety=Sweet harvest=2024-09-01"
        );
    }

    #[test]
    fn application_row_shows_stage_suffix() {
        let application = Application {
            id: "app-9f0c".to_string(),
            crop_id: "crop-1a2b".to_string(),
            treatment_type: TreatmentType::Herbicide,
            product_name: "Atrazine".to_string(),
            quantity: 1.5,
            unit: "l".to_string(),
            date: "2024-06-10".to_string(),
            growth_stage: Some("vegetative".to_string()),
            method: None,
            weather: None,
            purpose: None,
            notes: None,
            created_at: "2024-06-10T00:00:00Z".to_string(),
        };
        assert_eq!(
            format_application_row(&application, &plain()),
            "app-9f0c 2024-06-10 (herbicide) Atrazine 1.5 l @vegetative"
        );
    }

    #[test]
    fn disabled_palette_leaves_text_plain() {
        let palette = plain();
        assert_eq!(palette.heading("Crops"), "Crops");
        assert_eq!(
            palette.priority(crate::recommend::Priority::High),
            "[HIGH]"
        );
    }
}
