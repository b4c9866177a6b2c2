use crate::cli::{CatalogCommands, TemplateSource};
use crate::error::{CliError, Result};
use rifdock::core::chemistry::template::TemplateRegistry;
use rifdock::core::rotamers::catalog::RotamerCatalog;
use rifdock::core::rotamers::generator::TemplateRotamerGenerator;
use rifdock::core::rotamers::spec::RotamerSpecList;
use std::path::Path;
use tracing::info;

pub fn generator(source: Option<&Path>) -> Result<TemplateRotamerGenerator> {
    let templates = match source {
        Some(path) => {
            info!("Loading residue templates from {:?}", path);
            TemplateRegistry::load(path)?
        }
        None => TemplateRegistry::builtin()?,
    };
    Ok(TemplateRotamerGenerator::new(templates))
}

pub fn build_from_spec(spec: &Path, templates: Option<&Path>) -> Result<RotamerCatalog> {
    let generator = generator(templates)?;
    let specs = RotamerSpecList::load(spec)?;
    info!("Building catalog from {} rotamer specs in {:?}", specs.len(), spec);
    Ok(specs.fill_catalog(&generator)?)
}

pub fn load_binary(path: &Path, templates: Option<&Path>) -> Result<RotamerCatalog> {
    let generator = generator(templates)?;
    info!("Loading binary catalog from {:?}", path);
    Ok(RotamerCatalog::load(path, &generator)?)
}

pub fn run(command: CatalogCommands) -> Result<()> {
    match command {
        CatalogCommands::Build {
            spec,
            output,
            templates: TemplateSource { templates },
        } => {
            let catalog = build_from_spec(&spec, templates.as_deref())?;
            catalog.save(&output)?;
            print!("{}", catalog);
            println!(
                "✓ Catalog with {} rotamers written to: {}",
                catalog.len(),
                output.display()
            );
        }
        CatalogCommands::Show {
            catalog,
            templates: TemplateSource { templates },
        } => {
            let catalog = load_binary(&catalog, templates.as_deref())?;
            print!("{}", catalog);
            println!("validation hash: {:016x}", catalog.validation_hash());
        }
        CatalogCommands::Match {
            spec,
            resname,
            chis,
            tolerance,
        } => {
            if !(tolerance >= 0.0) {
                return Err(CliError::Argument(format!(
                    "tolerance must be a non-negative angle, got {}",
                    tolerance
                )));
            }
            let specs = RotamerSpecList::load(&spec)?;
            match specs.matching_rotamer(&resname, &chis, tolerance) {
                Some(i) => println!("{}", i),
                None => {
                    return Err(CliError::Argument(format!(
                        "no rotamer of {} within {}° of {:?}",
                        resname, tolerance, chis
                    )));
                }
            }
        }
    }
    Ok(())
}
