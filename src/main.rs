use anyhow::Result;

fn main() -> Result<()> {
    civforge::cli::run()
}
