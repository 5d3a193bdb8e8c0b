use weft::ui::output;

fn main() {
    if let Err(e) = weft::cli::run() {
        output::error(format!("{e:#}"));
        std::process::exit(1);
    }
}
