fn main() {
    bnfgen::cli::run();
}
