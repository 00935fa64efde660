//! Help message display for CLI.

#![allow(clippy::print_stdout)]

use crate::config::Config;

/// Print help message based on configuration state.
pub fn print_smart_help(config: &Config) {
    print!("{}", smart_help(config));
}

fn smart_help(config: &Config) -> String {
    if config.models.is_empty() {
        first_time_help()
    } else {
        configured_help(config)
    }
}

/// Setup guide for first-time users.
fn first_time_help() -> String {
    [
        "No models configured. Get started with birdeye:",
        "",
        "1. Initialize configuration:",
        "   birdeye config init",
        "",
        "2. Export your image classifier to ONNX. It should take a",
        "   [1, side, side, 3] RGB float tensor scaled to 0-1 and output one",
        "   score per line of the labels file.",
        "",
        "3. Add your model to configuration:",
        "   birdeye models add garden --path ./birds.onnx --labels ./labels.txt --default",
        "",
        "4. Classify images:",
        "   birdeye photo.jpg",
        "",
        "Run 'birdeye -h' for all options.",
        "",
    ]
    .join("\n")
}

/// Brief usage reminder for configured users.
fn configured_help(config: &Config) -> String {
    let default = config
        .defaults
        .model
        .as_deref()
        .map_or_else(String::new, |name| format!(" (default model: {name})"));

    format!(
        "Usage: birdeye [IMAGES]... [OPTIONS]{default}\n\n\
         Example: birdeye photos/ -k 5 -c 0.2 -f csv,json\n\n\
         Run 'birdeye -h' for all options or 'birdeye models list' to see configured models.\n"
    )
}
