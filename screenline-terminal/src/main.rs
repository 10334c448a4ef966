/// Screenline Terminal Demo - Thick-line wireframe cube
///
/// Draws the edges of a rotating cube as perspective-correct thick lines.
/// Controls:
///   - WASD / Arrow Keys: Rotate the cube
///   - E/R: Roll rotation
///   - +/-: Line width
///   - Q/ESC: Quit
///
/// Logging goes to stderr, filtered by `SCREENLINE_LOG` (default `warn`).
use std::io;
use screenline_terminal::{demo_model, TerminalApp, TerminalConfig};
use tracing_subscriber::EnvFilter;

fn main() -> io::Result<()> {
    let filter = EnvFilter::try_from_env("SCREENLINE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = TerminalConfig::from_env();
    println!("Screenline Terminal Renderer - Loading...");

    let mut app = TerminalApp::new(demo_model(), config)?;

    println!("Starting terminal renderer (press Q to quit)...");
    std::thread::sleep(std::time::Duration::from_secs(1));

    app.run()?;

    println!("Thank you for using Screenline!");
    Ok(())
}
