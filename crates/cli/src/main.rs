use std::path::PathBuf;
use std::sync::Arc;

use api_shared::{CreatePatientReq, ListPatientsRes, PreviewRes, SummaryRes};
use clap::{Parser, Subcommand};
use discharge_core::config::{
    artifact_capacity_from_env_value, generation_timeout_from_env_value,
    lookup_policy_from_env_value, ollama_from_env_values,
};
use discharge_core::ollama::probe_capability;
use discharge_core::{
    CoreConfig, DischargeService, GenerationRequest, InMemoryRecordStore, LookupPolicy,
    NarrativeCapability, NewPatient, RecordStore,
};

#[derive(Parser)]
#[command(name = "discharge")]
#[command(about = "Discharge summary CLI tool")]
struct Cli {
    /// Patient dataset (.json, .yaml or .yml); falls back to DISCHARGE_DATASET
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    /// What to do when a patient ID is missing: strict or substitute
    #[arg(long, global = true)]
    policy: Option<LookupPolicy>,

    /// Skip the narrative model even if OLLAMA_URL is set
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored patients, 100 per page
    List {
        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Show the key facts for a patient before generating
    Preview {
        /// Patient ID
        patient_id: String,
    },
    /// Generate a discharge summary and write it as a PDF
    Generate {
        /// Patient ID
        patient_id: String,
        /// Discharge date (YYYY-MM-DD), today when omitted
        #[arg(long)]
        discharge_date: Option<String>,
        /// Requested detail level
        #[arg(long)]
        detail_level: Option<String>,
        /// Free-text notes from the discharging doctor
        #[arg(long)]
        doctor_notes: Option<String>,
        /// Where to write the PDF
        #[arg(long, default_value = "discharge_summary.pdf")]
        out: PathBuf,
        /// Print the summary sections as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a patient to the dataset
    Add {
        /// Patient's name
        name: String,
        #[arg(long)]
        sex: Option<String>,
        #[arg(long)]
        state: Option<String>,
        /// Excellent, Very good, Good, Fair or Poor
        #[arg(long)]
        general_health: Option<String>,
        #[arg(long)]
        chronic: bool,
        /// Length of stay in days
        #[arg(long)]
        stay: Option<u32>,
        /// Normal, Overweight or Obese
        #[arg(long)]
        risk: Option<String>,
        #[arg(long)]
        allergies: Option<String>,
        #[arg(long)]
        chief_complaint: Option<String>,
    },
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn build_service(cli: &Cli) -> Result<DischargeService, Box<dyn std::error::Error>> {
    let dataset = cli
        .dataset
        .clone()
        .or_else(|| env_value("DISCHARGE_DATASET").map(PathBuf::from));
    let policy = match cli.policy {
        Some(policy) => policy,
        None => lookup_policy_from_env_value(env_value("DISCHARGE_LOOKUP_POLICY"))?,
    };
    let ollama = if cli.offline {
        None
    } else {
        ollama_from_env_values(env_value("OLLAMA_URL"), env_value("OLLAMA_MODEL"))
    };

    let cfg = CoreConfig::new(
        dataset,
        None,
        artifact_capacity_from_env_value(env_value("DISCHARGE_ARTIFACT_CAPACITY"))?,
        env_value("DISCHARGE_LOGO_PATH").map(PathBuf::from),
        policy,
        generation_timeout_from_env_value(env_value("DISCHARGE_GENERATION_TIMEOUT_SECS"))?,
        ollama,
    )?;

    let store: Arc<dyn RecordStore> = match cfg.dataset_path() {
        Some(path) => Arc::new(InMemoryRecordStore::load_dataset(path)?),
        None => Arc::new(InMemoryRecordStore::new()),
    };
    let capability = match cfg.ollama() {
        Some(settings) => probe_capability(Some(settings), cfg.generation_timeout()),
        None => NarrativeCapability::Unavailable,
    };

    Ok(DischargeService::new(&cfg, store, capability))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let Some(command) = &cli.command else {
        println!("Use 'discharge --help' for available commands");
        return Ok(());
    };

    let service = build_service(&cli)?;

    match command {
        Commands::List { page } => {
            let listing = ListPatientsRes::from(&service.list_patients(*page)?);
            if listing.patients.is_empty() {
                println!("No patients found");
            }
            for patient in &listing.patients {
                println!(
                    "{:>6}  {}  ({}, {})",
                    patient.patient_id, patient.name, patient.sex, patient.state
                );
            }
            if listing.has_more {
                println!("More patients on page {}", listing.next_page);
            }
        }
        Commands::Preview { patient_id } => {
            let preview = PreviewRes::from(service.preview(patient_id)?);
            println!("{}", serde_json::to_string_pretty(&preview)?);
        }
        Commands::Generate {
            patient_id,
            discharge_date,
            detail_level,
            doctor_notes,
            out,
            json,
        } => {
            let request = GenerationRequest {
                patient_id: patient_id.clone(),
                detail_level: detail_level.clone(),
                doctor_notes: doctor_notes.clone(),
                discharge_date: discharge_date.clone(),
            };
            let outcome = service.generate(&request)?;
            let bytes = service.download(&outcome.document.to_string())?;
            std::fs::write(out, bytes.as_slice())?;

            let summary = SummaryRes::from(&outcome.summary);
            if *json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Diagnosis: {}", summary.diagnosis);
                println!("Condition: {}", summary.condition);
                if summary.is_fallback {
                    println!("Note: no stored record for this ID, summary uses fallback data");
                }
            }
            println!("Wrote {}", out.display());
        }
        Commands::Add {
            name,
            sex,
            state,
            general_health,
            chronic,
            stay,
            risk,
            allergies,
            chief_complaint,
        } => {
            let req = CreatePatientReq {
                name: Some(name.clone()),
                sex: sex.clone(),
                state: state.clone(),
                general_health: general_health.clone(),
                chronic_condition: *chronic,
                stay_duration: *stay,
                risk_category: risk.clone(),
                allergies: allergies.clone(),
                chief_complaint: chief_complaint.clone(),
                ..Default::default()
            };
            let record = service.add_patient(NewPatient::from(req))?;
            println!("Added patient {} with ID {}", record.name(), record.patient_id);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_defaults_output_path() {
        let cli = Cli::try_parse_from(["discharge", "generate", "12"]).unwrap();
        match cli.command {
            Some(Commands::Generate { patient_id, out, json, .. }) => {
                assert_eq!(patient_id, "12");
                assert_eq!(out, PathBuf::from("discharge_summary.pdf"));
                assert!(!json);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "discharge",
            "list",
            "--page",
            "3",
            "--dataset",
            "patients.json",
            "--policy",
            "substitute",
        ])
        .unwrap();
        assert_eq!(cli.dataset, Some(PathBuf::from("patients.json")));
        assert_eq!(cli.policy, Some(LookupPolicy::Substitute));
        assert!(matches!(cli.command, Some(Commands::List { page: 3 })));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(Cli::try_parse_from(["discharge", "--policy", "lenient", "list"]).is_err());
    }

    #[test]
    fn offline_service_generates_into_file() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("patients.json");
        std::fs::write(
            &dataset,
            r#"[{"patient_id": 1, "name": "Ravi", "general_health": "Good"}]"#,
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "discharge",
            "--offline",
            "--dataset",
            dataset.to_str().unwrap(),
            "preview",
            "1",
        ])
        .unwrap();
        let service = build_service(&cli).unwrap();
        assert!(!service.narrative_available());
        assert_eq!(service.preview("1").unwrap().name, "Ravi");
    }
}
