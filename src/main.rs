fn main() {
    bracket_odds::cli::run();
}
