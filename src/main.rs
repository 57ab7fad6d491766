use anyhow::Context;

fn main() -> anyhow::Result<()> {
    pantrysync::run().context("pantrysync failed")
}
