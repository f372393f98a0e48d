use anyhow::Context;
use fm_partition::{FmPartitioningConfig, Hypergraph};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::time;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let mut args = std::env::args().skip(1);
    let input = args.next().context("usage: main <netlist> [result file]")?;
    let output = args.next();

    let mut graph = Hypergraph::deserialize_netlist(&input)?;
    let t1 = time::Instant::now();
    let summary = graph.partition_fm(&FmPartitioningConfig::default())?;
    println!("time: {}ms", t1.elapsed().as_millis());
    println!("{summary}");

    match output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(&path)?);
            graph.write_result(&mut writer)?;
            writer.flush()?;
        }
        None => graph.write_result(&mut std::io::stdout())?,
    }
    Ok(())
}
