use clap::{Arg, ArgAction, Command, ValueHint};
use clap_complete::{generate_to, shells::*};
use std::env;
use std::io::Error;

// Mirror of build_cli() in src/main.rs, without help texts.
// Build scripts can't access src/ modules, so the flags are repeated here.
fn main() -> Result<(), Error> {
    let outdir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(outdir) => outdir,
    };

    let mut cmd = Command::new("objxml")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Serialize JSON documents into XML, optionally through an XSLT stylesheet")
        .arg_required_else_help(true)
        .arg(
            Arg::new("input")
                .help("Input JSON file ('-' reads stdin)")
                .required(true)
                .index(1)
                .value_hint(ValueHint::FilePath),
        )
        .arg(Arg::new("root-tag").long("root-tag").value_name("NAME"))
        .arg(
            Arg::new("exclude")
                .long("exclude")
                .value_name("KIND.RELATIONSHIP")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("encoding")
                .long("encoding")
                .value_name("ENCODING")
                .value_parser(["UTF-8", "ASCII", "ISO-8859-1"]),
        )
        .arg(Arg::new("pretty").long("pretty").action(ArgAction::SetTrue))
        .arg(Arg::new("single").long("single").action(ArgAction::SetTrue))
        .arg(
            Arg::new("xsl")
                .long("xsl")
                .value_name("PATH")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("xsl-base-path")
                .long("xsl-base-path")
                .value_name("DIR")
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("param")
                .long("param")
                .value_name("NAME=VALUE")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("xpath-param")
                .long("xpath-param")
                .value_name("NAME=EXPR")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count),
        );

    // Generate completions for bash
    generate_to(Bash, &mut cmd, "objxml", &outdir)?;

    // Generate completions for zsh
    generate_to(Zsh, &mut cmd, "objxml", &outdir)?;

    // Generate completions for fish
    generate_to(Fish, &mut cmd, "objxml", &outdir)?;

    println!("cargo:warning=Shell completions generated in {outdir:?}");

    Ok(())
}
