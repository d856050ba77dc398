fn main() -> anyhow::Result<()> {
    ripplecount::run()
}
