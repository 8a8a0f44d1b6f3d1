//! Skybox generation: extract the marked part of a map, shrink it, box it in and write it out

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::geom::Vector3;
use crate::replace::ModelReplacementTable;
use crate::vmf::{self, Document, SceneObject};

pub mod bounds;
pub mod extract;
pub mod fog;
pub mod merge;
pub mod room;
pub mod transform;

pub use room::RoomSettings;

/// Values for one generation run
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Write only the skybox instead of merging it into the input map
    pub skybox_only: bool,
    pub replace_models: bool,
    pub copy_fog_settings: bool,
}

/// Fixed parameters of the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Visgroup holding the content to turn into a skybox
    pub source_visgroup: String,
    /// Visgroup the merged skybox is kept in
    pub skybox_visgroup: String,
    pub scale: f64,
    pub room: RoomSettings,
    /// Gap between the host map's lowest point and the merged skybox
    pub merge_clearance: f64,
    pub wall_material: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            source_visgroup: "AutoSky".to_string(),
            skybox_visgroup: "3D Skybox (AutoSky)".to_string(),
            scale: 1.0 / 16.0,
            room: RoomSettings::default(),
            merge_clearance: 192.0,
            wall_material: "tools/toolsskybox".to_string(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Extracting,
    Transforming,
    Bounding,
    RoomBuilding,
    FogCopying,
    StandaloneExport,
    MergeBack,
    Done,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Stage::Validating => "Validating paths",
            Stage::Extracting => "Extracting visgroup",
            Stage::Transforming => "Scaling content",
            Stage::Bounding => "Measuring skybox",
            Stage::RoomBuilding => "Building skybox room",
            Stage::FogCopying => "Copying fog settings",
            Stage::StandaloneExport => "Writing skybox",
            Stage::MergeBack => "Merging skybox into map",
            Stage::Done => "Done",
        };
        f.write_str(text)
    }
}

/// Synchronous yes/no question put to whoever started the run
pub trait Confirm {
    fn confirm(&mut self, title: &str, message: &str) -> bool;
}

impl<F: FnMut(&str, &str) -> bool> Confirm for F {
    fn confirm(&mut self, title: &str, message: &str) -> bool {
        self(title, message)
    }
}

pub const EMPTY_VISGROUP_TITLE: &str = "Continue?";
pub const EMPTY_VISGROUP_MESSAGE: &str = "No AutoSky visgroup was found, or if it exists it doesn't contain anything. Proceed with generating an empty skybox?";
pub const UNRESOLVED_MODEL_TITLE: &str = "Unidentified model";

pub fn unresolved_model_message(model: &str) -> String {
    format!(
        "The model {} was found in the AutoSky visgroup, but no replacement is specified in the model replacement index. Proceed without replacing it?",
        model
    )
}

/// What a finished run produced
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    /// Objects taken from the source visgroup
    pub extracted: usize,
    pub replaced_models: usize,
    pub room: room::RoomLayout,
    pub output_path: PathBuf,
}

fn has_vmf_extension(path: &Path) -> bool {
    path.extension().is_some_and(|extension| extension.eq_ignore_ascii_case("vmf"))
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Checks both paths and parses the input map
pub fn validate(config: &GenerationConfig) -> Result<Document> {
    if !has_vmf_extension(&config.output_path) {
        return Err(Error::Validation("Invalid output path, or output path is not a VMF.".to_string()));
    }
    if !has_vmf_extension(&config.input_path) {
        return Err(Error::Validation("Invalid input path, or input path is not a VMF.".to_string()));
    }
    if same_file(&config.input_path, &config.output_path) {
        return Err(Error::Validation(
            "Overwriting the input VMF is prohibited. Please enter a different output path.".to_string()
        ));
    }
    if !config.input_path.is_file() {
        return Err(Error::Validation(format!("{} is not a valid filepath", config.input_path.display())));
    }
    vmf::load_vmf(&config.input_path).map_err(|source| Error::Parse {
        path: config.input_path.clone(),
        source,
    })
}

/// Runs the whole pipeline. Nothing is written unless every step succeeds.
///
/// Extraction works on a clone of the input map. In merge mode the output therefore still holds the
/// full size AutoSky content next to the new skybox, and only the clone is taken apart.
pub fn generate<C: Confirm + ?Sized, P: FnMut(Stage)>(
    config: &GenerationConfig,
    settings: &PipelineSettings,
    table: &ModelReplacementTable,
    confirm: &mut C,
    mut progress: P,
) -> Result<GenerationReport> {
    progress(Stage::Validating);
    let input = validate(config)?;
    log::info!("Loaded {} ({} solids, {} entities)", config.input_path.display(), input.world.solids.len(), input.entities.len());

    progress(Stage::Extracting);
    let mut source = input.clone();
    let solids_only = config.skybox_only;
    let mut objects = extract::extract(&mut source, &settings.source_visgroup, solids_only, !solids_only);
    let extracted = objects.len();
    if objects.is_empty() && !confirm.confirm(EMPTY_VISGROUP_TITLE, EMPTY_VISGROUP_MESSAGE) {
        return Err(Error::Cancelled);
    }

    progress(Stage::Transforming);
    let mut replaced_models = 0;
    if config.replace_models {
        for model in transform::unresolved_models(&objects, table) {
            if !confirm.confirm(UNRESOLVED_MODEL_TITLE, &unresolved_model_message(&model)) {
                return Err(Error::Cancelled);
            }
            log::warn!("No replacement for {}; Keeping it", model);
        }
        replaced_models = transform::replace_models(&mut objects, table);
    }
    transform::scale(&mut objects, Vector3::ZERO, Vector3::splat(settings.scale));
    if config.replace_models {
        transform::apply_orientation_corrections(&mut objects);
    }
    objects.push(SceneObject::Entity(fog::sky_camera(Vector3::ZERO, 1.0 / settings.scale)));
    let camera_index = objects.len() - 1;

    progress(Stage::Bounding);
    let content_bounds = bounds::bounds(&objects)?;
    log::debug!("Skybox content spans {} to {}", content_bounds.min, content_bounds.max);

    progress(Stage::RoomBuilding);
    let room_layout = room::RoomLayout::compute(&content_bounds, settings.room.min_block_unit)?;
    let walls = room::generate_room(
        &content_bounds,
        settings.room.min_block_unit,
        settings.room.wall_thickness,
        &settings.wall_material,
    )?;
    objects.extend(walls.into_iter().map(SceneObject::Solid));

    if config.copy_fog_settings {
        progress(Stage::FogCopying);
        match (fog::find_fog_controller(&input), objects[camera_index].as_entity_mut()) {
            (Some(controller), Some(camera)) => {
                let copied = fog::copy_fog_settings(controller, camera);
                log::info!("Copied {} fog setting(s) from {} {}", copied, fog::FOG_CONTROLLER_CLASS, controller.id);
            }
            _ => log::info!("No {} found; Keeping default fog", fog::FOG_CONTROLLER_CLASS),
        }
    }

    let output = if config.skybox_only {
        progress(Stage::StandaloneExport);
        let mut output = Document::new_empty();
        output.version_info.editor_build = input.version_info.editor_build.clone();
        output.adopt(objects);
        output
    } else {
        progress(Stage::MergeBack);
        let mut host = input;
        merge::merge_into(
            &mut host,
            objects,
            &settings.skybox_visgroup,
            settings.room.grid_snap,
            settings.merge_clearance,
            settings.room.wall_thickness,
        );
        host
    };

    vmf::export_vmf(&output, &config.output_path).map_err(|source| Error::Write {
        path: config.output_path.clone(),
        source,
    })?;
    log::info!("Wrote {}", config.output_path.display());
    progress(Stage::Done);

    Ok(GenerationReport {
        extracted,
        replaced_models,
        room: room_layout,
        output_path: config.output_path.clone(),
    })
}
