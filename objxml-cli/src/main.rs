// Command-line interface for objxml
//
// Reads a JSON document, serializes it into XML with the objxml tree
// serializer and writes the result, optionally run through an XSLT stylesheet.
//
// A JSON object at the top level supplies the named root values: each key
// becomes a child of the root element. Any other top-level value, or any
// value with --single, is serialized as the root itself.
//
// Usage:
//  objxml <input.json>                           - XML to stdout
//  objxml <input.json> -o out.xml                - XML to a file
//  objxml <input.json> --xsl page.xsl -o out.html - Through a stylesheet
//
// Settings are layered: built-in defaults, then objxml.toml in the working
// directory, then --config PATH, then the flags below.

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use objxml_config::{
    parse_exclusion, parse_param, ConfigError, Loader, ObjxmlConfig, PROJECT_CONFIG_FILE,
};
use objxml_core::transform::{ParamValue, Params, Stylesheet, XsltprocEngine};
use objxml_core::{
    publish, Bindings, Document, Encoding, PublishArtifact, PublishSpec, RenderOptions,
    Serializer, SerializerOptions,
};
use std::fs;
use std::io::{self, Read, Write};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn build_cli() -> Command {
    Command::new("objxml")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Serialize JSON documents into XML, optionally through an XSLT stylesheet")
        .long_about(
            "objxml turns a JSON document into an XML tree.\n\n\
            Object keys become element names: 'firstName' is written as <first-name>.\n\
            Keys may only contain ASCII letters and digits.\n\
            Arrays and nested objects become <item> children; object entries carry\n\
            their key in a 'key' attribute.\n\n\
            Examples:\n  \
            objxml people.json                          # XML to stdout\n  \
            objxml people.json --pretty -o people.xml   # Indented, to a file\n  \
            objxml people.json --xsl list.xsl --param title=People"
        )
        .arg_required_else_help(true)
        .arg(
            Arg::new("input")
                .help("Input JSON file ('-' reads stdin)")
                .required(true)
                .index(1)
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("root-tag")
                .long("root-tag")
                .value_name("NAME")
                .help("Name of the root element (used as-is)"),
        )
        .arg(
            Arg::new("exclude")
                .long("exclude")
                .value_name("KIND.RELATIONSHIP")
                .help("Relationship not to follow (repeatable)")
                .action(ArgAction::Append)
                .value_parser(parse_exclude_arg),
        )
        .arg(
            Arg::new("encoding")
                .long("encoding")
                .value_name("ENCODING")
                .help("Output encoding: UTF-8, ASCII or ISO-8859-1"),
        )
        .arg(
            Arg::new("pretty")
                .long("pretty")
                .help("Indent the XML output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("single")
                .long("single")
                .help("Serialize the whole document as the root value")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("xsl")
                .long("xsl")
                .value_name("PATH")
                .help("Stylesheet to apply to the serialized document")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("xsl-base-path")
                .long("xsl-base-path")
                .value_name("DIR")
                .help("Directory absolute xsl:include and xsl:import hrefs are anchored at")
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("param")
                .long("param")
                .value_name("NAME=VALUE")
                .help("String parameter for the stylesheet (repeatable)")
                .action(ArgAction::Append)
                .value_parser(parse_param_arg),
        )
        .arg(
            Arg::new("xpath-param")
                .long("xpath-param")
                .value_name("NAME=EXPR")
                .help("XPath parameter for the stylesheet (repeatable)")
                .action(ArgAction::Append)
                .value_parser(parse_param_arg),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("Output file path (defaults to stdout)")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to an objxml.toml configuration file")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log more (repeat for debug and trace output)")
                .action(ArgAction::Count),
        )
}

fn parse_param_arg(raw: &str) -> Result<(String, String), String> {
    parse_param(raw).map_err(|e| e.to_string())
}

fn parse_exclude_arg(raw: &str) -> Result<(String, String), String> {
    parse_exclusion(raw).map_err(|e| e.to_string())
}

fn main() {
    let matches = build_cli().get_matches();
    init_tracing(matches.get_count("verbose"));

    let config = load_cli_config(&matches);
    let options = serializer_options(&config, &matches);
    let render = config.render_options().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    let input = matches
        .get_one::<String>("input")
        .expect("input is required");
    let value = read_input(input);

    let document = serialize(&options, &value, matches.get_flag("single"));
    let output = matches.get_one::<String>("output").map(|s| s.as_str());

    match matches.get_one::<String>("xsl") {
        Some(xsl) => handle_transform(&document, render, xsl, output, &config, &matches),
        None => handle_plain(&document, render, output),
    }
}

/// Log to stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_cli_config(matches: &ArgMatches) -> ObjxmlConfig {
    let loader = Loader::new().with_optional_file(PROJECT_CONFIG_FILE);
    let loader = match matches.get_one::<String>("config") {
        Some(path) => loader.with_file(path),
        None => loader,
    };

    apply_overrides(loader, matches)
        .and_then(Loader::build)
        .unwrap_or_else(|err| {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1);
        })
}

/// Command-line flags take precedence over every configuration file.
fn apply_overrides(
    mut loader: Loader,
    matches: &ArgMatches,
) -> Result<Loader, ConfigError> {
    let string_flags = [
        ("root-tag", "serialize.root_tag_name"),
        ("encoding", "render.encoding"),
        ("xsl-base-path", "transform.base_path"),
    ];
    for (flag, key) in string_flags {
        if let Some(value) = matches.get_one::<String>(flag) {
            loader = loader.set_override(key, value.as_str())?;
        }
    }
    if matches.get_flag("pretty") {
        loader = loader.set_override("render.pretty", true)?;
    }
    Ok(loader)
}

fn serializer_options(config: &ObjxmlConfig, matches: &ArgMatches) -> SerializerOptions {
    let mut options = config.serializer_options().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });
    if let Some(extra) = matches.get_many::<(String, String)>("exclude") {
        for (kind, relationship) in extra {
            options.exclusions.insert(kind.as_str(), relationship.as_str());
        }
    }
    options
}

fn read_input(input: &str) -> serde_json::Value {
    let text = if input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map(|_| buffer)
            .unwrap_or_else(|e| {
                eprintln!("Error reading stdin: {e}");
                std::process::exit(1);
            })
    } else {
        fs::read_to_string(input).unwrap_or_else(|e| {
            eprintln!("Error reading file '{input}': {e}");
            std::process::exit(1);
        })
    };

    serde_json::from_str(&text).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON from '{input}': {e}");
        std::process::exit(1);
    })
}

fn serialize(options: &SerializerOptions, value: &serde_json::Value, single: bool) -> Document {
    let serializer = Serializer::new(options.clone());
    let result = match value.as_object() {
        Some(object) if !single => {
            let bindings: Bindings<'_> = object.iter().collect();
            debug!(bindings = bindings.len(), "serializing top-level object keys");
            serializer.serialize(&bindings)
        }
        _ => serializer.serialize_single(value),
    };

    result.unwrap_or_else(|e| {
        eprintln!("Serialization error: {e}");
        std::process::exit(1);
    })
}

fn handle_plain(document: &Document, render: RenderOptions, output: Option<&str>) {
    match output {
        Some(path) => write_artifact(
            PublishSpec::new(document)
                .with_render(render)
                .with_output_path(path),
            render.encoding,
        ),
        None => {
            let bytes = document.render_bytes(&render).unwrap_or_else(|e| {
                eprintln!("Render error: {e}");
                std::process::exit(1);
            });
            io::stdout().write_all(&bytes).unwrap_or_else(|e| {
                eprintln!("Error writing output: {e}");
                std::process::exit(1);
            });
        }
    }
}

fn handle_transform(
    document: &Document,
    render: RenderOptions,
    xsl: &str,
    output: Option<&str>,
    config: &ObjxmlConfig,
    matches: &ArgMatches,
) {
    let resolver = config.transform.resolver().unwrap_or_else(|e| {
        eprintln!("Error: cannot determine the working directory: {e}");
        std::process::exit(1);
    });
    let stylesheet = Stylesheet::load(xsl, &resolver).unwrap_or_else(|e| {
        eprintln!("Stylesheet error: {e}");
        std::process::exit(1);
    });
    info!(
        stylesheet = xsl,
        modules = stylesheet.includes().len(),
        "loaded stylesheet"
    );

    let engine = XsltprocEngine::new();
    let encoding = render.encoding;
    let spec = PublishSpec::new(document)
        .with_render(render)
        .with_stylesheet(&engine, &stylesheet)
        .with_params(stylesheet_params(config, matches));
    let spec = match output {
        Some(path) => spec.with_output_path(path),
        None => spec,
    };
    write_artifact(spec, encoding);
}

/// Configured parameters, then `--param` and `--xpath-param` in that order.
fn stylesheet_params(config: &ObjxmlConfig, matches: &ArgMatches) -> Params {
    let mut params = config.transform.params().unwrap_or_else(|e| {
        eprintln!("Error: transform.params: {e}");
        std::process::exit(1);
    });
    let flags = [("param", false), ("xpath-param", true)];
    for (flag, xpath) in flags {
        let Some(values) = matches.get_many::<(String, String)>(flag) else {
            continue;
        };
        for (name, value) in values {
            let value = if xpath {
                ParamValue::XPath(value.clone())
            } else {
                ParamValue::String(value.clone())
            };
            params.insert(name.as_str(), value);
        }
    }
    params
}

fn write_artifact(spec: PublishSpec<'_>, encoding: Encoding) {
    match publish(spec) {
        Ok(PublishArtifact::InMemory(text)) => {
            io::stdout()
                .write_all(&encoding.encode(&text))
                .unwrap_or_else(|e| {
                    eprintln!("Error writing output: {e}");
                    std::process::exit(1);
                });
        }
        Ok(PublishArtifact::File(path)) => info!(path = %path.display(), "wrote output"),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
