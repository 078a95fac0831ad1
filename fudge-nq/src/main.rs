mod parser;

use anyhow::{anyhow, Context as _, Result};
use fudge_wire::{Context, MapResolver, Taxonomy, Value};
use std::io::{self, Read, Write};
use std::str::from_utf8;
use structopt::StructOpt;

/// Decode and pretty-print fudge messages, or parse the textual form back into wire bytes.
#[derive(StructOpt)]
#[structopt(name = "nq")]
struct Opt {
    /// parse a textual representation from stdin and encode it into wire bytes instead
    #[structopt(short, long)]
    encode: bool,

    /// taxonomy id to tag the envelope with when encoding, so names get rewritten to ordinals
    /// against the built-in demo taxonomies below (0 = none). Decoding always consults the same
    /// built-in taxonomies, keyed by whatever id the envelope itself carries.
    #[structopt(short, long, default_value = "0")]
    taxonomy: i16,

    /// enable verbose diagnostics on stderr
    #[structopt(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    let mut builder = env_logger::Builder::from_default_env();
    if opt.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    let mut buffer = Vec::new();
    io::stdin().read_to_end(&mut buffer).context("failed to read stdin")?;

    if opt.encode {
        encode(&buffer, opt.taxonomy)
    } else {
        decode(&buffer)
    }
}

/// A handful of built-in taxonomies so the CLI can demonstrate taxonomy-assisted name/ordinal
/// fill-in without a configuration subsystem of its own.
fn demo_resolver() -> MapResolver {
    let mut resolver = MapResolver::new();

    let mut crew = Taxonomy::new();
    crew.insert(5, "Kirk");
    crew.insert(14, "Wylie");
    crew.insert(928, "Jim");
    crew.insert(74, "Moores");
    resolver.register(45, crew);

    resolver
}

fn decode(buffer: &[u8]) -> Result<()> {
    let ctx = Context::with_resolver(demo_resolver());
    let envelope = ctx.deserialize(&mut &buffer[..]).context("failed to decode envelope")?;
    log::debug!("decoded envelope version {} taxonomy {}", envelope.version, envelope.taxonomy_id);
    println!("{}", parser::render_message(&envelope.message));
    Ok(())
}

fn encode(buffer: &[u8], taxonomy: i16) -> Result<()> {
    let text = from_utf8(buffer).context("input is not utf-8")?;
    let field = parser::parse(text)?;
    let message = match field.value {
        Value::Message(msg) => msg,
        other => return Err(anyhow!("top-level textual input must be a parenthesized message, got {:?}", other)),
    };
    let ctx = Context::with_resolver(demo_resolver());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    ctx.serialize(&message, taxonomy, &mut out)?;
    out.flush()?;
    Ok(())
}
