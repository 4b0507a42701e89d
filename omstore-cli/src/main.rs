use clap::{Parser, Subcommand, ValueEnum};
use omstore::convert::{self, HashRecord, StorageRecord};
use omstore::index::{self, IndexDefinition};
use omstore::schema::parse_schema;
use omstore::{DataStructure, Entity, Schema};
use std::path::PathBuf;
use std::process;

/// omstore CLI: inspect how a schema maps entities onto the store
#[derive(Parser)]
#[command(name = "omstore", version, about)]
struct Cli {
    /// Path to the schema YAML file
    #[arg(long)]
    schema: PathBuf,

    /// Output format
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Show the search index the schema declares
    Index {
        /// Declare fields for this data structure instead of the schema's own
        #[arg(long)]
        data_structure: Option<String>,
        /// Print the full index-creation argument list
        #[arg(long)]
        args: bool,
    },

    /// Encode an entity given as a JSON object into its storage record
    Encode {
        /// Entity fields as JSON (e.g. --entity '{"title":"Ascension"}')
        #[arg(long)]
        entity: String,
    },

    /// Decode a storage record given as JSON back into entity fields
    Decode {
        /// A JSON object of strings for HASH schemas, the document for JSON schemas
        #[arg(long)]
        record: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let schema = parse_schema(&cli.schema)?;
    log::debug!("Loaded schema for '{}' from {}", schema.entity_name(), cli.schema.display());

    let output = match cli.command {
        Command::Index {
            data_structure,
            args,
        } => index_output(&schema, data_structure.as_deref(), args)?,

        Command::Encode { entity } => {
            let entity = Entity::from_json(&schema, serde_json::from_str(&entity)?)?;
            match convert::encode(&schema, entity.data())? {
                StorageRecord::Hash(fields) => serde_json::to_value(sorted(fields))?,
                StorageRecord::Json(document) => document,
            }
        }

        Command::Decode { record } => {
            let json: serde_json::Value = serde_json::from_str(&record)?;
            let record = match schema.data_structure() {
                DataStructure::Hash => StorageRecord::Hash(serde_json::from_value(json)?),
                DataStructure::Json => StorageRecord::Json(json),
            };
            let data = convert::decode(&schema, &record)?;
            Entity::from_data(&schema, data)?.to_json()
        }
    };

    print_output(&output, &cli.format)
}

fn index_output(
    schema: &Schema,
    data_structure: Option<&str>,
    args: bool,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let mut definition = IndexDefinition::from_schema(schema);
    if let Some(data_structure) = data_structure {
        definition.data_structure = data_structure.parse()?;
        definition.fields = index::build(schema, definition.data_structure);
    }

    if args {
        return Ok(serde_json::to_value(definition.to_args())?);
    }
    Ok(serde_json::json!({
        "name": definition.name,
        "on": definition.data_structure.to_string(),
        "prefix": definition.key_prefix,
        "fields": definition.fields,
    }))
}

fn sorted(fields: HashRecord) -> std::collections::BTreeMap<String, String> {
    fields.into_iter().collect()
}

fn print_output(
    value: &serde_json::Value,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}
