//! Generation snapshots and the fitness log
//!
//! Dumps are human-readable text, one file per generation. The fitness log is
//! a CSV file that gains one `generation,best,average` row per generation.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{NeatError, Result};
use crate::population::{GenerationSummary, Population};

/// Write a readable dump of every species and genome
pub fn write_generation_dump<W: Write>(
    writer: &mut W,
    population: &Population,
) -> std::io::Result<()> {
    for (species_index, species) in population.species.iter().enumerate() {
        writeln!(writer, "=== SPECIES {} ===", species_index)?;
        writeln!(writer, "Average Fitness: {:.2}", species.mean_fitness())?;

        for (genome_index, genome) in species.members.iter().enumerate() {
            writeln!(writer)?;
            writeln!(writer, "--- Genom {} (Fitness: {:.2}) ---", genome_index, genome.fitness)?;

            writeln!(writer, "Nodes:")?;
            for node in genome.nodes() {
                writeln!(writer, "  Node ID: {}, Type: {}", node.id, node.node_type)?;
            }

            writeln!(writer, "Connections:")?;
            for conn in genome.connections() {
                let note = if genome.is_mutation_gene(conn) {
                    " [mutation]"
                } else {
                    ""
                };
                writeln!(
                    writer,
                    "  {} -> {} | Weight: {:.4} | Enabled: {}{}",
                    conn.source, conn.target, conn.weight, conn.enabled, note
                )?;
            }
        }
        writeln!(writer)?;
    }

    writeln!(writer)?;
    writeln!(writer, "--- TOTAL GENOMES: {} ---", population.len())?;
    Ok(())
}

/// Save the dump of the current generation to `dir/generation_<n>.txt`
pub fn save_generation_dump(dir: impl AsRef<Path>, population: &Population) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| NeatError::io(dir, e))?;

    let path = dir.join(format!("generation_{}.txt", population.generation));
    let file = fs::File::create(&path).map_err(|e| NeatError::io(&path, e))?;
    let mut writer = std::io::BufWriter::new(file);
    write_generation_dump(&mut writer, population)
        .and_then(|_| writer.flush())
        .map_err(|e| NeatError::io(&path, e))?;

    log::debug!("Saved generation dump to {}", path.display());
    Ok(path)
}

/// Append one `generation,best,average` row to the fitness log
///
/// The file is created on first use; there is no header row.
pub fn append_fitness_log(path: impl AsRef<Path>, summary: &GenerationSummary) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| NeatError::io(parent, e))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| NeatError::io(path, e))?;

    writeln!(
        file,
        "{},{:.4},{:.4}",
        summary.generation, summary.best_fitness, summary.average_fitness
    )
    .map_err(|e| NeatError::io(path, e))
}
