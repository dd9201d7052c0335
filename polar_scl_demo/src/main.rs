use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use env_logger::Env;
use hex::{FromHex, encode as hex_encode};
use log::{LevelFilter, debug, info};
use polar_scl_core::bits::flip_random_bits;
use polar_scl_core::{
    FrozenMask, FuzzyExtractor, HelperData, PolarError, PolarParams, PolarSession, derive_rng,
    profile_by_name, profile_tiny,
};
use rand::RngCore;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "polar-scl",
    author,
    version,
    about = "Polar code SCL decoder and fuzzy extractor"
)]
struct Cli {
    #[arg(long, global = true)]
    debug: bool,
    /// Named parameter profile (tiny, sram-1024, sram-1024-wide, sram-2048).
    #[arg(long, global = true, default_value = "sram-1024")]
    profile: String,
    #[arg(long, global = true, value_name = "N")]
    code_length: Option<usize>,
    #[arg(long, global = true, value_name = "K")]
    info_length: Option<usize>,
    #[arg(long, global = true, value_name = "L")]
    list_size: Option<usize>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a seed-derived random frozen bit mask with K information bits.
    GenMask {
        #[arg(long, default_value = "polar-scl-mask")]
        seed: String,
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },
    /// Encode an N-bit information word (hex).
    Encode {
        #[arg(long, value_name = "FILE")]
        mask: PathBuf,
        #[arg(long, value_name = "HEX")]
        input: String,
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// List-decode an N-bit received word (hex).
    Decode {
        #[arg(long, value_name = "FILE")]
        mask: PathBuf,
        #[arg(long, value_name = "HEX")]
        input: String,
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Enroll a fingerprint reading and write the public helper data.
    Enroll {
        #[arg(long, value_name = "FILE")]
        mask: PathBuf,
        #[arg(long, value_name = "HEX")]
        fingerprint: String,
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
        #[arg(long, value_name = "FILE")]
        key_out: Option<PathBuf>,
    },
    /// Reproduce the enrolled key from a fresh fingerprint reading.
    Reproduce {
        #[arg(long, value_name = "FILE")]
        helper: PathBuf,
        #[arg(long, value_name = "HEX")]
        fingerprint: String,
        #[arg(long, value_name = "FILE")]
        key_out: Option<PathBuf>,
    },
    /// Run the 16-bit worked example, then enroll and reproduce a simulated reading.
    Demo {
        #[arg(long, default_value_t = 3)]
        flips: usize,
        #[arg(long, default_value = "polar-scl-demo")]
        seed: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);
    let params = resolve_params(&cli)?;
    debug!(
        "parameters N={} K={} L={}",
        params.code_length(),
        params.info_length(),
        params.list_size()
    );
    match cli.command {
        Commands::GenMask { seed, out } => cmd_gen_mask(params, &seed, out),
        Commands::Encode { mask, input, out } => cmd_encode(params, mask, &input, out),
        Commands::Decode { mask, input, out } => cmd_decode(params, mask, &input, out),
        Commands::Enroll {
            mask,
            fingerprint,
            out,
            key_out,
        } => cmd_enroll(params, mask, &fingerprint, out, key_out),
        Commands::Reproduce {
            helper,
            fingerprint,
            key_out,
        } => cmd_reproduce(params, helper, &fingerprint, key_out),
        Commands::Demo { flips, seed } => cmd_demo(params, flips, &seed),
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(default));
    builder.format_timestamp(None);
    if debug {
        builder.filter_level(LevelFilter::Debug);
    }
    let _ = builder.try_init();
}

fn resolve_params(cli: &Cli) -> Result<PolarParams> {
    let profile = profile_by_name(&cli.profile)
        .with_context(|| format!("unknown parameter profile '{}'", cli.profile))?;
    let base = profile.params;
    let params = PolarParams::new(
        cli.code_length.unwrap_or(base.code_length()),
        cli.info_length.unwrap_or(base.info_length()),
        cli.list_size.unwrap_or(base.list_size()),
    )
    .context("invalid code parameters")?;
    Ok(params)
}

fn cmd_gen_mask(params: PolarParams, seed: &str, out: PathBuf) -> Result<()> {
    let mut rng = derive_rng(&parse_seed(seed)?, 0);
    let mask = FrozenMask::random(&params, &mut rng);
    save_json(&out, "frozen mask", &mask)?;
    println!(
        "Wrote frozen mask with {} information bits to {}",
        mask.weight(),
        out.display()
    );
    Ok(())
}

fn cmd_encode(params: PolarParams, mask: PathBuf, input: &str, out: Option<PathBuf>) -> Result<()> {
    let mask = load_mask(&mask, &params)?;
    let info_word = parse_hex(input, "information word")?;
    let codeword = PolarSession::new(params).encode(&info_word, mask.as_bytes())?;
    let encoded = hex_encode(&codeword);
    if let Some(path) = out {
        save_json(&path, "codeword", &encoded)?;
    }
    println!("{encoded}");
    Ok(())
}

fn cmd_decode(params: PolarParams, mask: PathBuf, input: &str, out: Option<PathBuf>) -> Result<()> {
    let mask = load_mask(&mask, &params)?;
    let received = parse_hex(input, "received word")?;
    let report = PolarSession::new(params).decode_with_report(&received, mask.as_bytes())?;
    for (slot, path) in report.paths.iter().enumerate() {
        match path {
            Some(path) => println!(
                "slot {slot}: {} metric={} message={}",
                hex_encode(&path.word),
                path.metric,
                hex_encode(mask.extract(&path.word))
            ),
            None => println!("slot {slot}: -"),
        }
    }
    if let Some(path) = out {
        let words: Vec<Option<String>> = report
            .paths
            .iter()
            .map(|entry| entry.as_ref().map(|p| hex_encode(&p.word)))
            .collect();
        save_json(&path, "candidate list", &words)?;
    }
    Ok(())
}

fn cmd_enroll(
    params: PolarParams,
    mask: PathBuf,
    fingerprint: &str,
    out: PathBuf,
    key_out: Option<PathBuf>,
) -> Result<()> {
    let mask = load_mask(&mask, &params)?;
    let fingerprint = parse_hex(fingerprint, "fingerprint")?;
    let (helper, key) = FuzzyExtractor::new(params).enroll(&mask, &fingerprint)?;
    save_json(&out, "helper data", &helper)?;
    let key_hex = hex_encode(&key[..]);
    if let Some(path) = key_out {
        save_json(&path, "key", &key_hex)?;
    }
    println!("Wrote helper data to {}", out.display());
    println!("key: {key_hex}");
    Ok(())
}

fn cmd_reproduce(
    params: PolarParams,
    helper: PathBuf,
    fingerprint: &str,
    key_out: Option<PathBuf>,
) -> Result<()> {
    let helper: HelperData = load_json(&helper, "helper data")?;
    let fingerprint = parse_hex(fingerprint, "fingerprint")?;
    let reproduction = FuzzyExtractor::new(params).reproduce_with_report(&fingerprint, &helper)?;
    let key_hex = hex_encode(&reproduction.key[..]);
    if let Some(path) = key_out {
        save_json(&path, "key", &key_hex)?;
    }
    debug!(
        "matched slot {} of {} candidates",
        reproduction.slot, reproduction.candidates
    );
    println!("key: {key_hex}");
    Ok(())
}

fn cmd_demo(params: PolarParams, flips: usize, seed: &str) -> Result<()> {
    let tiny = profile_tiny();
    let session = PolarSession::new(tiny);
    let mask = FrozenMask::from_hex(&tiny, "6a96")?;
    let codeword = session.encode_message(&[0x69], &mask)?;
    println!(
        "Worked example: N={} K={} L={} mask={} message=69 codeword={}",
        tiny.code_length(),
        tiny.info_length(),
        tiny.list_size(),
        mask.to_hex(),
        hex_encode(&codeword)
    );
    let report = session.decode_with_report(&codeword, mask.as_bytes())?;
    for (slot, path) in report.paths.iter().enumerate() {
        if let Some(path) = path {
            println!(
                "  slot {slot}: word={} metric={} message={}",
                hex_encode(&path.word),
                path.metric,
                hex_encode(mask.extract(&path.word))
            );
        }
    }

    let seed = parse_seed(seed)?;
    let mask = FrozenMask::random(&params, &mut derive_rng(&seed, 0));
    let mut fingerprint = vec![0u8; params.code_bytes()];
    derive_rng(&seed, 1).fill_bytes(&mut fingerprint);
    let extractor = FuzzyExtractor::new(params);
    let (helper, key) = extractor.enroll(&mask, &fingerprint)?;
    println!(
        "Enrolled N={} K={} L={}: key={}",
        params.code_length(),
        params.info_length(),
        params.list_size(),
        hex_encode(&key[..])
    );

    let flipped = flip_random_bits(
        &mut fingerprint,
        params.code_length(),
        flips,
        &mut derive_rng(&seed, 2),
    );
    info!("re-measurement with bit errors at {:?}", flipped);
    match extractor.reproduce_with_report(&fingerprint, &helper) {
        Ok(reproduction) => {
            let matches = *reproduction.key == *key;
            println!(
                "Reproduced with {} bit errors from slot {} of {}: key={} ({})",
                flipped.len(),
                reproduction.slot,
                reproduction.candidates,
                hex_encode(&reproduction.key[..]),
                if matches { "match" } else { "MISMATCH" }
            );
            if !matches {
                bail!("reproduced key differs from the enrolled key");
            }
        }
        Err(PolarError::NoMatchingCandidate) => println!(
            "Reproduction with {} bit errors failed: no candidate matched; try a larger --list-size",
            flipped.len()
        ),
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

fn load_mask(path: &Path, params: &PolarParams) -> Result<FrozenMask> {
    let mask: FrozenMask = load_json(path, "frozen mask")?;
    let mask = FrozenMask::from_bytes(params, mask.as_bytes())
        .with_context(|| format!("frozen mask in {} does not fit the parameters", path.display()))?;
    Ok(mask)
}

fn parse_hex(text: &str, label: &str) -> Result<Vec<u8>> {
    let bytes = Vec::from_hex(text.trim()).with_context(|| format!("parsing {label} as hex"))?;
    Ok(bytes)
}

fn load_json<T: DeserializeOwned>(path: &Path, label: &str) -> Result<T> {
    let data =
        fs::read(path).with_context(|| format!("reading {} from {}", label, path.display()))?;
    let value = serde_json::from_slice(&data)
        .with_context(|| format!("parsing {} from {}", label, path.display()))?;
    Ok(value)
}

fn save_json<T: ?Sized + serde::Serialize>(path: &Path, label: &str, value: &T) -> Result<()> {
    let serialized = serde_json::to_string_pretty(value)?;
    fs::write(path, serialized)
        .with_context(|| format!("writing {} to {}", label, path.display()))?;
    Ok(())
}

fn parse_seed(seed: &str) -> Result<Vec<u8>> {
    if let Some(hex) = seed.strip_prefix("hex:") {
        let bytes = Vec::from_hex(hex.trim())
            .with_context(|| "failed to parse hex-encoded seed".to_string())?;
        Ok(bytes)
    } else {
        Ok(seed.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn profile_with_overrides() {
        let cli = Cli::try_parse_from(["polar-scl", "--profile", "tiny", "--list-size", "8", "demo"])
            .unwrap();
        let params = resolve_params(&cli).unwrap();
        assert_eq!(
            (params.code_length(), params.info_length(), params.list_size()),
            (16, 8, 8)
        );
    }

    #[test]
    fn rejects_unknown_profile_and_bad_overrides() {
        let cli = Cli::try_parse_from(["polar-scl", "--profile", "nope", "demo"]).unwrap();
        assert!(resolve_params(&cli).is_err());
        let cli = Cli::try_parse_from(["polar-scl", "--code-length", "100", "demo"]).unwrap();
        assert!(resolve_params(&cli).is_err());
    }

    #[test]
    fn seeds_accept_hex_prefix() {
        assert_eq!(parse_seed("hex:0a0b").unwrap(), vec![0x0a, 0x0b]);
        assert_eq!(parse_seed("abc").unwrap(), b"abc".to_vec());
        assert!(parse_seed("hex:zz").is_err());
    }

    #[test]
    fn mask_and_helper_files_round_trip() {
        let dir = tempdir().unwrap();
        let params = profile_tiny();
        let mask_path = dir.path().join("mask.json");
        let helper_path = dir.path().join("helper.json");

        let mask = FrozenMask::from_hex(&params, "6a96").unwrap();
        save_json(&mask_path, "frozen mask", &mask).unwrap();
        let loaded = load_mask(&mask_path, &params).unwrap();
        assert_eq!(loaded, mask);
        let wider = PolarParams::new(16, 9, 4).unwrap();
        assert!(load_mask(&mask_path, &wider).is_err());

        let extractor = FuzzyExtractor::new(params);
        let (helper, key) = extractor.enroll(&mask, &[0x42, 0x14]).unwrap();
        save_json(&helper_path, "helper data", &helper).unwrap();
        let restored: HelperData = load_json(&helper_path, "helper data").unwrap();
        assert_eq!(restored, helper);
        assert_eq!(*extractor.reproduce(&[0x42, 0x14], &restored).unwrap(), *key);
    }

    #[test]
    fn missing_file_names_the_label() {
        let dir = tempdir().unwrap();
        let err = load_json::<HelperData>(&dir.path().join("absent.json"), "helper data")
            .unwrap_err();
        assert!(format!("{err:#}").contains("reading helper data"));
    }
}
