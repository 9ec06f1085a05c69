use crossterm::style::Stylize;
use trials_cli::config::config::Config;

fn print_help() {
    println!("{}", "trials-cli - ClinicalTrials.gov v2 search".blue().bold());
    println!();
    println!("{}", "Usage:".yellow());
    println!("  trials-cli [OPTIONS]");
    println!();
    println!("{}", "Options:".yellow());
    println!(
        "  {}         - Use the prompt-based classic mode",
        "--classic".green()
    );
    println!(
        "  {} - Generate config file with defaults",
        "--generate-config".green()
    );
    println!("  {}       - Show this help", "--help, -h".green());
    println!();
    println!("{}", "Environment:".yellow());
    println!("  {}  - Override the registry base URL", "CTGOV_API_URL".green());
    println!("  {}       - Log filter (default: info)", "RUST_LOG".green());
    println!();
    println!("{}", "Keys (TUI mode):".yellow());
    println!("  {}  - Move between the three filter fields", "Tab".green());
    println!("  {} - Run the search", "Enter".green());
    println!("  {}    - Toggle help", "F1".green());
    println!("  {}   - Back / exit", "Esc".green());
    println!();
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.contains(&"--help".to_string()) || args.contains(&"-h".to_string()) {
        print_help();
        return Ok(());
    }

    // Check for config file generation
    if args.contains(&"--generate-config".to_string()) {
        match Config::get_config_path() {
            Ok(path) => {
                let config_content = Config::create_default_with_comments();
                if let Some(parent) = path.parent() {
                    if let Err(e) = std::fs::create_dir_all(parent) {
                        eprintln!("Error creating config directory: {}", e);
                        std::process::exit(1);
                    }
                }
                if let Err(e) = std::fs::write(&path, config_content) {
                    eprintln!("Error writing config file: {}", e);
                    std::process::exit(1);
                }
                println!("Configuration file created at: {:?}", path);
                println!("Edit this file to customize trials-cli.");
                return Ok(());
            }
            Err(e) => {
                eprintln!("Error determining config path: {}", e);
                std::process::exit(1);
            }
        }
    }

    // The TUI owns the terminal, so logs go to a file
    match trials_cli::utils::logging::init_tracing() {
        Ok(log_path) => {
            eprintln!("Debug logs will be written to:");
            eprintln!("   {}", log_path.display());
            eprintln!("   Tail with: tail -f {}", log_path.display());
            eprintln!();
        }
        Err(e) => {
            eprintln!("Warning: could not set up logging: {}", e);
        }
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    let base_url =
        std::env::var("CTGOV_API_URL").unwrap_or_else(|_| config.api.base_url.clone());

    if args.contains(&"--classic".to_string()) {
        if let Err(e) = trials_cli::classic::run_classic(&base_url, &config) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        return Ok(());
    }

    println!("Starting TUI mode... (use --classic for the prompt mode)");
    if let Err(e) = trials_cli::ui::search_tui::run_search_tui(&base_url, &config) {
        eprintln!("TUI Error: {}", e);
        eprintln!("Falling back to classic mode...");
        eprintln!();
        if let Err(e) = trials_cli::classic::run_classic(&base_url, &config) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
