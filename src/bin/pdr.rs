//! Demo driver for the PDR core: reads a small textual netlist format (not
//! AIGER/BLIF — a front-end for those formats is out of scope for this
//! crate) and reports whether the distinguished property holds.
//!
//! Format, one statement per line, blank lines and `#`-comments ignored:
//!
//! ```text
//! pi <name>
//! flop <name> <init: 0|1|x>
//! and <name> <lit> <lit>
//! next <flop-name> <lit>
//! po <name> <lit>
//! property <lit>
//! constraint <lit>
//! ```
//!
//! A `<lit>` is a previously declared name, optionally prefixed with `!`
//! for negation, or the literal `true`/`false`.
use std::collections::HashMap;
use std::fs;
use std::process::ExitCode;

use clap::Parser;
use hwmc_pdr::config::Cli;
use hwmc_pdr::netlist::{self, GateRef, Netlist, PoKind};
use hwmc_pdr::pdr::{PdrEngine, Verdict};

fn parse_lit(tok: &str, names: &HashMap<String, GateRef>) -> Result<GateRef, String> {
    let (neg, base) = match tok.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, tok),
    };
    let r = match base {
        "true" => GateRef::TRUE,
        "false" => GateRef::TRUE.negate(),
        name => *names.get(name).ok_or_else(|| format!("undefined signal `{}`", name))?,
    };
    Ok(r.signed_by(neg))
}

fn parse_netlist(text: &str) -> Result<Netlist, String> {
    let mut n = Netlist::new();
    let mut names: HashMap<String, GateRef> = HashMap::new();
    names.insert("true".into(), GateRef::TRUE);

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let toks: Vec<&str> = line.split_whitespace().collect();
        let ctx = |msg: &str| format!("line {}: {}", lineno + 1, msg);
        match toks.as_slice() {
            ["pi", name] => {
                let g = n.add_pi(Some(names.len() as u32)).map_err(|e| ctx(&e.to_string()))?;
                names.insert((*name).to_string(), g);
            }
            ["flop", name, init] => {
                let init = match *init {
                    "0" => Some(false),
                    "1" => Some(true),
                    "x" => None,
                    other => return Err(ctx(&format!("bad init value `{}`", other))),
                };
                let g = n.add_flop(Some(names.len() as u32), init).map_err(|e| ctx(&e.to_string()))?;
                names.insert((*name).to_string(), g);
            }
            ["and", name, a, b] => {
                let la = parse_lit(a, &names).map_err(|e| ctx(&e))?;
                let lb = parse_lit(b, &names).map_err(|e| ctx(&e))?;
                let g = n.add_and(la, lb);
                names.insert((*name).to_string(), g);
            }
            ["next", flop, lit] => {
                let flop = *names.get(*flop).ok_or_else(|| ctx(&format!("undefined flop `{}`", flop)))?;
                let l = parse_lit(lit, &names).map_err(|e| ctx(&e))?;
                n.set_flop_next(flop, l).map_err(|e| ctx(&e.to_string()))?;
            }
            ["po", name, lit] => {
                let l = parse_lit(lit, &names).map_err(|e| ctx(&e))?;
                let g = n.add_po(PoKind::Output, l);
                names.insert((*name).to_string(), g);
            }
            ["property", lit] => {
                let l = parse_lit(lit, &names).map_err(|e| ctx(&e))?;
                n.add_po(PoKind::Property, l);
            }
            ["constraint", lit] => {
                let l = parse_lit(lit, &names).map_err(|e| ctx(&e))?;
                n.add_po(PoKind::Constraint, l);
            }
            _ => return Err(ctx(&format!("unrecognized statement: {}", line))),
        }
    }
    netlist::prepare(&mut n).map_err(|e| e.to_string())?;
    Ok(n)
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    let text = match fs::read_to_string(&cli.netlist) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error reading {}: {}", cli.netlist.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let netlist = match parse_netlist(&text) {
        Ok(n) => n,
        Err(e) => {
            eprintln!("error parsing netlist: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let quiet = cli.quiet;
    let config = cli.into_config();
    let mut engine = PdrEngine::new(&netlist, config);
    match engine.run() {
        Ok(Verdict::Proved { invariant }) => {
            println!("PROVED");
            if !quiet {
                println!("invariant has {} cubes", invariant.len());
            }
            ExitCode::SUCCESS
        }
        Ok(Verdict::Failed { cex }) => {
            println!("DISPROVED");
            if !quiet {
                println!("counterexample depth: {}", cex.pi_steps.len());
            }
            ExitCode::SUCCESS
        }
        Ok(Verdict::Undetermined { bug_free_depth }) => {
            println!("UNDETERMINED (bug-free to depth {})", bug_free_depth);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
