use clap::{Arg, Command};
use std::path::PathBuf;
use treedo::{CoreHandler, JsonRpcServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new("treedo")
        .version("0.1.0")
        .about("Hierarchical task tree backend")
        .arg(
            Arg::new("data-dir")
                .short('d')
                .long("data-dir")
                .value_name("PATH")
                .help("Base directory holding the .treedo data directory")
                .required(true),
        )
        .arg(
            Arg::new("mode")
                .short('m')
                .long("mode")
                .value_name("MODE")
                .help("Execution mode: server, summary, seed")
                .default_value("server"),
        )
        .get_matches();
    let base_path = PathBuf::from(
        matches
            .get_one::<String>("data-dir")
            .expect("Data directory is required"),
    );
    let mode = matches.get_one::<String>("mode").unwrap();
    println!("{}", treedo::version_info());
    println!("Data dir: {:?}", base_path);
    println!("Mode: {}", mode);
    let handler = CoreHandler::new(base_path).await?;
    match mode.as_str() {
        "server" => {
            println!("Starting JSON-RPC server...");
            let server = JsonRpcServer::new(Box::new(handler));
            server.run_stdio().await?
        }
        "summary" => {
            let overview = handler.get_statistics(None).await?;
            println!("Task summary:");
            println!("  Total: {}", overview.status_counts.total);
            println!("  Not started: {}", overview.status_counts.not_started);
            println!("  In progress: {}", overview.status_counts.in_progress);
            println!("  Completed: {}", overview.status_counts.completed);
            println!("  Blocked: {}", overview.status_counts.blocked);
            println!(
                "  Completion rate: {:.0}%",
                overview.status_counts.completion_rate * 100.0
            );
            println!("  Overdue: {}", overview.due.overdue.len());
            println!("  Due today: {}", overview.due.due_today.len());
            println!("  Upcoming: {}", overview.due.upcoming.len());
            println!("  Longest completion streak: {} day(s)", overview.longest_streak);
        }
        "seed" => {
            // CoreHandler::new already materialized the sample dataset when
            // no snapshot existed; a fresh listing confirms what is on disk.
            let projects = handler.get_projects().await?;
            println!("Seeded {} project(s):", projects.len());
            for project in &projects {
                println!("  - {} ({})", project.name, project.id);
            }
        }
        _ => {
            eprintln!("Unknown mode: {}. Use 'server', 'summary' or 'seed'", mode);
            std::process::exit(1);
        }
    }
    Ok(())
}
