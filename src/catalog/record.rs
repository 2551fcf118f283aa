use crate::catalog::status::StatusId;
use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Text columns of an imported spreadsheet row, in source-sheet order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    HardDriveName,
    CarrierA,
    CarrierALocation,
    CarrierB,
    CarrierBLocation,
    HardDriveBarcodeId,
    FileFolderName,
    SubFolderName,
    FileName,
    InventoryNumber,
    SourceInventoryNumber,
    SourceBarcode,
    Title,
    JobNumber,
    SourceType,
    Resolution,
    Compression,
    FileFormat,
    FileSize,
    FrameRate,
    TotalRunningTime,
    SourceFrameRate,
    AspectRatio,
    ColorBitDepth,
    ColorType,
    FrameLayout,
    SampleStructure,
    SampleRate,
    CaptureDeviceMakeAndModel,
    CaptureDeviceSettings,
    DateCaptureCompleted,
    VideoEditSoftwareAndSettings,
    DateEditCompleted,
    ColorGradingSoftware,
    ColorGradingSettings,
    AudioFileFormat,
    DateAudioEditCompleted,
    RemasterPlatform,
    RemasterSoftware,
    RemasterSettings,
    DateRemasterCompleted,
    Subtitles,
    WatermarkType,
    SecurityDataEncrypted,
    MigrationOrPreservationRecord,
    HardDriveLocation,
    DateJobStarted,
    DateJobCompleted,
    GeneralEntryCatalogedBy,
    Notes,
}

impl Field {
    pub const ALL: [Field; 50] = [
        Field::HardDriveName,
        Field::CarrierA,
        Field::CarrierALocation,
        Field::CarrierB,
        Field::CarrierBLocation,
        Field::HardDriveBarcodeId,
        Field::FileFolderName,
        Field::SubFolderName,
        Field::FileName,
        Field::InventoryNumber,
        Field::SourceInventoryNumber,
        Field::SourceBarcode,
        Field::Title,
        Field::JobNumber,
        Field::SourceType,
        Field::Resolution,
        Field::Compression,
        Field::FileFormat,
        Field::FileSize,
        Field::FrameRate,
        Field::TotalRunningTime,
        Field::SourceFrameRate,
        Field::AspectRatio,
        Field::ColorBitDepth,
        Field::ColorType,
        Field::FrameLayout,
        Field::SampleStructure,
        Field::SampleRate,
        Field::CaptureDeviceMakeAndModel,
        Field::CaptureDeviceSettings,
        Field::DateCaptureCompleted,
        Field::VideoEditSoftwareAndSettings,
        Field::DateEditCompleted,
        Field::ColorGradingSoftware,
        Field::ColorGradingSettings,
        Field::AudioFileFormat,
        Field::DateAudioEditCompleted,
        Field::RemasterPlatform,
        Field::RemasterSoftware,
        Field::RemasterSettings,
        Field::DateRemasterCompleted,
        Field::Subtitles,
        Field::WatermarkType,
        Field::SecurityDataEncrypted,
        Field::MigrationOrPreservationRecord,
        Field::HardDriveLocation,
        Field::DateJobStarted,
        Field::DateJobCompleted,
        Field::GeneralEntryCatalogedBy,
        Field::Notes,
    ];

    /// Fields concatenated (with `/`) when looking for inline notes or
    /// inventory numbers.
    pub const PATH_FIELDS: [Field; 3] = [Field::FileFolderName, Field::SubFolderName, Field::FileName];

    pub fn name(self) -> &'static str {
        match self {
            Field::HardDriveName => "hard_drive_name",
            Field::CarrierA => "carrier_a",
            Field::CarrierALocation => "carrier_a_location",
            Field::CarrierB => "carrier_b",
            Field::CarrierBLocation => "carrier_b_location",
            Field::HardDriveBarcodeId => "hard_drive_barcode_id",
            Field::FileFolderName => "file_folder_name",
            Field::SubFolderName => "sub_folder_name",
            Field::FileName => "file_name",
            Field::InventoryNumber => "inventory_number",
            Field::SourceInventoryNumber => "source_inventory_number",
            Field::SourceBarcode => "source_barcode",
            Field::Title => "title",
            Field::JobNumber => "job_number",
            Field::SourceType => "source_type",
            Field::Resolution => "resolution",
            Field::Compression => "compression",
            Field::FileFormat => "file_format",
            Field::FileSize => "file_size",
            Field::FrameRate => "frame_rate",
            Field::TotalRunningTime => "total_running_time",
            Field::SourceFrameRate => "source_frame_rate",
            Field::AspectRatio => "aspect_ratio",
            Field::ColorBitDepth => "color_bit_depth",
            Field::ColorType => "color_type",
            Field::FrameLayout => "frame_layout",
            Field::SampleStructure => "sample_structure",
            Field::SampleRate => "sample_rate",
            Field::CaptureDeviceMakeAndModel => "capture_device_make_and_model",
            Field::CaptureDeviceSettings => "capture_device_settings",
            Field::DateCaptureCompleted => "date_capture_completed",
            Field::VideoEditSoftwareAndSettings => "video_edit_software_and_settings",
            Field::DateEditCompleted => "date_edit_completed",
            Field::ColorGradingSoftware => "color_grading_software",
            Field::ColorGradingSettings => "color_grading_settings",
            Field::AudioFileFormat => "audio_file_format",
            Field::DateAudioEditCompleted => "date_audio_edit_completed",
            Field::RemasterPlatform => "remaster_platform",
            Field::RemasterSoftware => "remaster_software",
            Field::RemasterSettings => "remaster_settings",
            Field::DateRemasterCompleted => "date_remaster_completed",
            Field::Subtitles => "subtitles",
            Field::WatermarkType => "watermark_type",
            Field::SecurityDataEncrypted => "security_data_encrypted",
            Field::MigrationOrPreservationRecord => "migration_or_preservation_record",
            Field::HardDriveLocation => "hard_drive_location",
            Field::DateJobStarted => "date_job_started",
            Field::DateJobCompleted => "date_job_completed",
            Field::GeneralEntryCatalogedBy => "general_entry_cataloged_by",
            Field::Notes => "notes",
        }
    }

    pub fn from_name(name: &str) -> Result<Field, CatalogError> {
        let wanted = name.trim();
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.name() == wanted)
            .ok_or_else(|| CatalogError::UnknownField(wanted.to_string()))
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Keys that live next to the text columns but are never part of a
/// blank / non-blank decision.
pub const RELATIONAL_KEYS: [&str; 8] = [
    "id",
    "assigned_user",
    "status",
    "asset_type",
    "file_type",
    "media_type",
    "ingest_date",
    "uuid",
];

/// Relational and lookup data attached to a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordLinks {
    pub assigned_user: Option<String>,
    pub asset_type: Option<String>,
    pub file_type: Option<String>,
    pub media_type: Option<String>,
    pub ingest_date: Option<String>,
    pub uuid: Option<String>,
}

/// One imported spreadsheet row. Every text column is always present; blank
/// is the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRecord", into = "RawRecord")]
pub struct Record {
    pub id: u64,
    values: Vec<String>,
    pub status: BTreeSet<StatusId>,
    pub links: RecordLinks,
}

impl Record {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            values: vec![String::new(); Field::ALL.len()],
            status: BTreeSet::new(),
            links: RecordLinks::default(),
        }
    }

    pub fn with(mut self, field: Field, value: &str) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: Field) -> &str {
        &self.values[field.index()]
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.values[field.index()] = value.into();
    }

    pub fn is_blank(&self, field: Field) -> bool {
        self.get(field).trim().is_empty()
    }

    /// Fields that hold anything other than whitespace.
    pub fn populated_fields(&self) -> impl Iterator<Item = Field> + '_ {
        Field::ALL.into_iter().filter(|field| !self.is_blank(*field))
    }

    /// True when every text column is blank. Relational data is ignored.
    pub fn is_empty(&self) -> bool {
        self.populated_fields().next().is_none()
    }

    /// The record names a sub folder or a file, so it describes actual content.
    pub fn has_file_info(&self) -> bool {
        !self.is_blank(Field::SubFolderName) || !self.is_blank(Field::FileName)
    }

    pub fn path_string(&self) -> String {
        Field::PATH_FIELDS
            .iter()
            .map(|field| self.get(*field))
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawRecord {
    id: u64,
    #[serde(default)]
    status: BTreeSet<StatusId>,
    #[serde(flatten)]
    links: RecordLinks,
    #[serde(flatten)]
    fields: BTreeMap<String, String>,
}

impl TryFrom<RawRecord> for Record {
    type Error = CatalogError;

    fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
        let mut record = Record::new(raw.id);
        record.status = raw.status;
        record.links = raw.links;
        for (name, value) in raw.fields {
            record.set(Field::from_name(&name)?, value);
        }
        Ok(record)
    }
}

impl From<Record> for RawRecord {
    fn from(record: Record) -> Self {
        let fields = Field::ALL
            .iter()
            .map(|field| (field.name().to_string(), record.get(*field).to_string()))
            .collect();
        RawRecord {
            id: record.id,
            status: record.status,
            links: record.links,
            fields,
        }
    }
}
