use crossterm::{execute, style::ResetColor};
use std::io::{self, Write};
use std::panic;

pub fn initialize_panic_handler() {
    better_panic::install();

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        restore_terminal();
        log::error!("Panic: {panic_info}");

        default_hook(panic_info);

        std::process::exit(1);
    }));
}

/// Drops any color left active by styled output that was cut short.
pub fn restore_terminal() {
    let _ = execute!(io::stdout(), ResetColor);
    let _ = io::stdout().flush();
    let _ = writeln!(io::stderr());
}
