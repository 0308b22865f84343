fn main() {
    std::process::exit(scfit_cli::run_from_env());
}
