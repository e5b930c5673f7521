fn main() -> Result<(), Box<dyn std::error::Error>> {
    nova::cli::main()
}
