fn main() -> anyhow::Result<()> {
    record_desk::cli::run()
}
