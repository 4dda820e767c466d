//! Codeplug tool command line
//!
//! Subcommands: verify a configuration file, inspect a DFU container,
//! and encode/decode codeplugs for a supported radio model.

use anyhow::{anyhow, bail, Context};
use dmrconf::config::Config;
use dmrconf::formats::{dfu, read_dfu, read_metadata, write_dfu, write_metadata, Metadata};
use dmrconf::radios::{codeplug_for, list_radios, Codeplug};
use dmrconf::tabular::{read_tabular, write_tabular};
use dmrconf::verify::IssueStack;
use dmrconf::yaml::{read_config, write_config, ExtensionRegistry};
use std::env;
use std::fs;
use std::path::Path;
use tracing_subscriber::{fmt::format::FmtSpan, prelude::*, EnvFilter};

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} <command> [options]", program);
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  verify [--yaml|--csv] <file>             check a configuration file");
    eprintln!("  info <file.dfu>                          list a container's images");
    eprintln!("  encode --radio=<model> <cfg> <out.dfu>   build a codeplug");
    eprintln!("  decode --radio=<model> <in.dfu> <cfg>    extract a configuration");
    eprintln!("  radios                                   list supported models");
    std::process::exit(1);
}

#[derive(Clone, Copy, PartialEq)]
enum Format {
    Yaml,
    Tabular,
}

fn format_for(path: &str, forced: Option<Format>) -> Format {
    if let Some(format) = forced {
        return format;
    }
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some("csv") | Some("conf") => Format::Tabular,
        _ => Format::Yaml,
    }
}

fn read_config_file(path: &str, format: Format, stack: &mut IssueStack) -> anyhow::Result<Config> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    let config = match format {
        Format::Yaml => read_config(&text, &ExtensionRegistry::new(), stack)
            .map_err(|e| anyhow!("{}: {}", path, e))?,
        Format::Tabular => read_tabular(&text, stack).map_err(|e| anyhow!("{}: {}", path, e))?,
    };
    Ok(config)
}

fn write_config_file(path: &str, format: Format, config: &Config) -> anyhow::Result<()> {
    let text = match format {
        Format::Yaml => write_config(config)?,
        Format::Tabular => write_tabular(config)?,
    };
    fs::write(path, text).with_context(|| format!("writing {}", path))?;
    Ok(())
}

fn cmd_verify(args: &[String]) -> anyhow::Result<i32> {
    let mut forced = None;
    let mut file = None;
    for arg in args {
        match arg.as_str() {
            "--yaml" => forced = Some(Format::Yaml),
            "--csv" => forced = Some(Format::Tabular),
            other if !other.starts_with("--") => file = Some(other.to_string()),
            other => bail!("unknown option {}", other),
        }
    }
    let file = file.ok_or_else(|| anyhow!("verify needs a file argument"))?;

    let mut stack = IssueStack::new();
    let config = read_config_file(&file, format_for(&file, forced), &mut stack)?;
    config.verify(&mut stack);

    for issue in stack.iter() {
        println!("{}", issue);
    }
    if stack.has_critical() {
        return Ok(1);
    }
    println!(
        "{}: {} channels, {} contacts, {} zones",
        file,
        config.channels.len(),
        config.contacts.len(),
        config.zones.len()
    );
    Ok(0)
}

fn cmd_info(args: &[String]) -> anyhow::Result<i32> {
    let [file] = args else {
        bail!("info needs exactly one container file");
    };
    let images = read_dfu(file).with_context(|| format!("reading {}", file))?;
    if let Some(meta) = read_metadata(file)? {
        match meta.firmware {
            Some(fw) => println!("radio: {} (firmware {})", meta.radio, fw),
            None => println!("radio: {}", meta.radio),
        }
    }
    print!("{}", dfu::dump(&images));
    Ok(0)
}

fn radio_option(args: &[String]) -> anyhow::Result<(String, Vec<String>)> {
    let mut model = None;
    let mut rest = Vec::new();
    for arg in args {
        if let Some(value) = arg.strip_prefix("--radio=") {
            model = Some(value.to_string());
        } else {
            rest.push(arg.clone());
        }
    }
    let model = model.ok_or_else(|| anyhow!("missing --radio=<model>"))?;
    Ok((model, rest))
}

fn cmd_encode(args: &[String]) -> anyhow::Result<i32> {
    let (model, rest) = radio_option(args)?;
    let [cfg_path, out_path] = &rest[..] else {
        bail!("encode needs <cfg> and <out.dfu>");
    };
    let mut codeplug = codeplug_for(&model)
        .ok_or_else(|| anyhow!("unknown radio {}, see `dmrconf radios`", model))?;

    let mut stack = IssueStack::new();
    let config = read_config_file(cfg_path, format_for(cfg_path, None), &mut stack)?;
    config.verify(&mut stack);
    for issue in stack.iter() {
        eprintln!("{}", issue);
    }
    if stack.has_critical() {
        bail!("configuration has critical issues, not encoding");
    }

    codeplug.allocate_for_encoding(&config)?;
    codeplug.encode(&config)?;
    write_dfu(out_path, std::slice::from_ref(codeplug.image()))?;
    write_metadata(
        out_path,
        &Metadata {
            radio: codeplug.model().to_string(),
            firmware: None,
        },
    )?;
    println!("wrote {}", out_path);
    Ok(0)
}

fn cmd_decode(args: &[String]) -> anyhow::Result<i32> {
    let (model, rest) = radio_option(args)?;
    let [in_path, cfg_path] = &rest[..] else {
        bail!("decode needs <in.dfu> and <cfg>");
    };
    let mut codeplug = codeplug_for(&model)
        .ok_or_else(|| anyhow!("unknown radio {}, see `dmrconf radios`", model))?;

    let images = read_dfu(in_path).with_context(|| format!("reading {}", in_path))?;
    let image = images
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("{} contains no images", in_path))?;
    *codeplug.image_mut() = image;

    let config = codeplug.decode()?;
    write_config_file(cfg_path, format_for(cfg_path, None), &config)?;
    println!("wrote {}", cfg_path);
    Ok(0)
}

fn cmd_radios() -> anyhow::Result<i32> {
    for info in list_radios() {
        println!("{:12} {}", info.model, info.description);
    }
    Ok(0)
}

fn main() -> anyhow::Result<()> {
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let format_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_span_events(FmtSpan::NONE);
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(format_layer)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage(&args[0]);
    }
    let code = match args[1].as_str() {
        "verify" => cmd_verify(&args[2..])?,
        "info" => cmd_info(&args[2..])?,
        "encode" => cmd_encode(&args[2..])?,
        "decode" => cmd_decode(&args[2..])?,
        "radios" => cmd_radios()?,
        _ => usage(&args[0]),
    };
    std::process::exit(code);
}
