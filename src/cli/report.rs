use console::style;
use crate::cli::commands::ReportArgs;
use crate::errors::GateError;
use crate::summary::{JobHistory, Qualifier};
use crate::trend::{latest_trend, Comparison, Direction};
use crate::utils::formatting::format_score;

fn qualifier_of(args: &ReportArgs, config: &crate::config::GateConfig) -> Qualifier {
    let (app, version) = super::app_identity(config, args.app_name.as_ref(), args.app_version.as_ref());
    Qualifier::new(app.as_deref().unwrap_or_default(), version.as_deref().unwrap_or_default())
}

fn arrow<T>(c: &Comparison<T>) -> String {
    match c.direction {
        Some(Direction::More) => style("\u{25b2}").red().to_string(),
        Some(Direction::Less) => style("\u{25bc}").green().to_string(),
        Some(Direction::Equal) => "=".to_string(),
        None => " ".to_string(),
    }
}

fn previous_u32(c: &Comparison<u32>) -> String {
    c.previous.map_or_else(|| "-".to_string(), |p| p.to_string())
}

pub async fn handle_trend(args: ReportArgs) -> Result<(), GateError> {
    let config = super::load_config(&args.common).await?;
    let history = JobHistory::new(super::builds_dir(&args.common, &config));
    let qualifier = qualifier_of(&args, &config);

    let latest = latest_trend(&history, &qualifier)
        .await?
        .ok_or_else(|| GateError::NotFound("No finished builds".into()))?;
    let merged = latest.trend;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&merged)?);
        return Ok(());
    }

    println!("{} build #{} ({})", style("Trend").bold(), latest.build, qualifier);
    println!(
        "  {:<12} {:>10} {:>10} {}",
        "Score",
        format_score(merged.score.current),
        merged.score.previous.map_or_else(|| "-".to_string(), format_score),
        arrow(&merged.score),
    );
    println!(
        "  {:<12} {:>10} {:>10} {}",
        "Issues",
        merged.total_issues.current,
        previous_u32(&merged.total_issues),
        arrow(&merged.total_issues),
    );
    for folder in &merged.folders {
        println!(
            "  {:<12} {:>10} {:>10} {}",
            folder.name,
            folder.issues.current,
            previous_u32(&folder.issues),
            arrow(&folder.issues),
        );
    }
    Ok(())
}

pub async fn handle_history(args: ReportArgs) -> Result<(), GateError> {
    let config = super::load_config(&args.common).await?;
    let history = JobHistory::new(super::builds_dir(&args.common, &config));
    let qualifier = qualifier_of(&args, &config);
    let points = history.score_history(&qualifier).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }
    if points.is_empty() {
        println!("No recorded scores for {}", qualifier);
        return Ok(());
    }
    println!("{} ({})", style("Score history").bold(), qualifier);
    for point in points {
        println!("  #{:<6} {}", point.build, format_score(point.score));
    }
    Ok(())
}
