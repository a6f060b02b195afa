//! # treeline Demo Driver
//!
//! Drives a tree with random churn: each step draws a key from a small
//! alphabet and removes it when present, inserts it otherwise. A
//! breadth-first dump of the tree is logged periodically, which makes the
//! split/borrow/merge behavior easy to watch with a small degree.
//!
//! ## Usage
//!
//! ```bash
//! # small tree that is easy to visualize
//! treeline churn.btree
//!
//! # larger nodes, longer keys, fixed op count
//! treeline churn.btree --degree 128 --key-size 32 --key-len 3 --ops 100000
//! ```
//!
//! The seed is fixed by default so every run produces the same sequence;
//! pass `--seed` to vary it.

use std::path::PathBuf;
use std::time::Instant;

use eyre::{bail, Result, WrapErr};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use treeline::BTreeIndex;

struct Args {
    path: PathBuf,
    degree: u32,
    key_size: u32,
    key_len: usize,
    ops: u64,
    seed: u64,
    dump_every: u64,
    fresh: bool,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = parse_args()?;

    if args.fresh {
        match std::fs::remove_file(&args.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).wrap_err("failed to remove existing tree file"),
        }
    }

    let mut index = BTreeIndex::open(&args.path, args.degree, args.key_size)
        .wrap_err_with(|| format!("failed to open '{}'", args.path.display()))?;
    if args.key_len >= index.key_size() as usize {
        bail!(
            "--key-len {} does not fit key slots of {} bytes",
            args.key_len,
            index.key_size()
        );
    }
    let mut rng = StdRng::seed_from_u64(args.seed);

    tracing::info!(
        path = %args.path.display(),
        degree = index.degree(),
        key_size = index.key_size(),
        ops = args.ops,
        seed = args.seed,
        "starting churn"
    );

    let started = Instant::now();
    for step in 0..args.ops {
        let key: Vec<u8> = (0..args.key_len).map(|_| rng.gen_range(b'a'..=b'z')).collect();

        if index.contains(&key)? {
            index.remove(&key)?;
        } else {
            index.put(&key, step)?;
        }

        if step % args.dump_every == 0 {
            tracing::info!(
                step,
                size = index.size(),
                elapsed = ?started.elapsed(),
                "\n{}",
                dump_tree(&index)?
            );
        }
    }

    index.sync()?;
    tracing::info!(
        size = index.size(),
        node_count = index.node_count(),
        elapsed = ?started.elapsed(),
        "done\n{}",
        dump_tree(&index)?
    );
    Ok(())
}

/// Renders the tree one level per line, each node as `index:[keys]`,
/// followed by the size and the free-node stack.
fn dump_tree(index: &BTreeIndex) -> treeline::Result<String> {
    let mut out = String::new();
    let mut level = vec![0u32];

    while !level.is_empty() {
        let mut next_level = Vec::new();
        for node in level {
            next_level.extend(index.children_of(node)?);

            let keys = index.keys_of(node)?;
            let rendered: Vec<String> = if index.degree() < 4 {
                keys.iter().map(|k| render_key(k)).collect()
            } else if keys.is_empty() {
                Vec::new()
            } else {
                vec![format!(
                    "{}...{}",
                    render_key(&keys[0]),
                    render_key(&keys[keys.len() - 1])
                )]
            };
            out.push_str(&format!("{}:[{}]  ", node, rendered.join(", ")));
        }
        out.push('\n');
        level = next_level;
    }

    let free: Vec<String> = index
        .free_nodes()?
        .iter()
        .map(|i| i.to_string())
        .collect();
    out.push_str(&format!("size='{}' free='{}'\n", index.size(), free.join(", ")));
    Ok(out)
}

fn render_key(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        path: PathBuf::new(),
        degree: 2,
        key_size: 8,
        key_len: 1,
        ops: 1_000_000,
        seed: 0,
        dump_every: 10_000,
        fresh: false,
    };
    let mut path = None;

    let raw: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < raw.len() {
        match raw[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-v" => {
                println!("treeline {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--fresh" | "-f" => args.fresh = true,
            "--degree" => args.degree = take_value(&raw, &mut i)?,
            "--key-size" => args.key_size = take_value(&raw, &mut i)?,
            "--key-len" => args.key_len = take_value(&raw, &mut i)?,
            "--ops" => args.ops = take_value(&raw, &mut i)?,
            "--seed" => args.seed = take_value(&raw, &mut i)?,
            "--dump-every" => args.dump_every = take_value(&raw, &mut i)?,
            arg if arg.starts_with('-') => bail!("unknown option: {arg}"),
            arg => {
                if path.replace(PathBuf::from(arg)).is_some() {
                    bail!("more than one path argument");
                }
            }
        }
        i += 1;
    }

    match path {
        Some(p) => args.path = p,
        None => {
            print_usage();
            bail!("missing tree file path");
        }
    }
    if args.dump_every == 0 {
        bail!("--dump-every must be at least 1");
    }
    Ok(args)
}

fn take_value<T: std::str::FromStr>(raw: &[String], i: &mut usize) -> Result<T> {
    let flag = raw[*i].clone();
    *i += 1;
    let value = raw
        .get(*i)
        .ok_or_else(|| eyre::eyre!("{flag} requires a value"))?;
    value
        .parse()
        .map_err(|_| eyre::eyre!("invalid value '{value}' for {flag}"))
}

fn print_usage() {
    println!(
        "Usage: treeline <path> [options]

Random put/remove churn against a tree file, with periodic dumps.

Options:
  --degree <n>      B-tree degree for a newly created file (default 2)
  --key-size <n>    key slot width for a newly created file (default 8)
  --key-len <n>     generated key length in letters (default 1)
  --ops <n>         operations to run (default 1000000)
  --seed <n>        RNG seed (default 0)
  --dump-every <n>  log a tree dump every n ops (default 10000)
  --fresh, -f       delete the tree file first
  --help, -h        show this help
  --version, -v     show version"
    );
}
