fn main() {
    piv_pipeline::cli::run();
}
