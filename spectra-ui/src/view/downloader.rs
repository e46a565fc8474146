//! Downloader view controller
//!
//! View 1 takes a VOTABLE (SSAP link, uploaded file or pasted text) and shows
//! the parse result with the spectra list and the DataLink form. View 2 shows
//! the per-file download log.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use spectra_common::cookies::{CookieJar, LAST_DIRECTORY};
use spectra_common::protocol::{
    DataLinkParam, DownloadRequest, DownloaderRequest, SpectrumDownloaded, SpectrumRef,
    VotableParsed, DOWNLOADER_NAMESPACE, SPECTRA_DOWNLOADED, SPECTRUM_DOWNLOADED, VOTABLE_PARSED,
};
use spectra_common::{Error, Result};
use tracing::{debug, warn};

use super::{SelectOption, StatusClass, StatusText, ViewController, DISCONNECTED_ALERT};
use crate::dispatch::Dispatcher;

/// The spectra list never grows taller than this many rows
const MAX_LIST_SIZE: usize = 20;

pub const NO_SPECTRUM_SELECTED_ALERT: &str = "You must select at least one spectrum to download";
pub const NO_FILE_SELECTED_ALERT: &str = "Select VOTABLE file first!";

/// User actions on the downloader page
#[derive(Debug, Clone, PartialEq)]
pub enum DownloaderCommand {
    InputType(VotInputType),
    /// Submit an SSAP endpoint URL
    ProcessUrl(String),
    /// Submit a VOTABLE file from disk
    Upload(Option<PathBuf>),
    /// Submit pasted VOTABLE text
    ProcessDirect(String),
    Back,
    /// Replace the spectra selection with these option values
    Select(Vec<String>),
    SelectAll,
    UseDataLink(bool),
    DataLinkParam { name: String, value: String },
    Directory(String),
    Download,
}

/// How the VOTABLE is supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VotInputType {
    Link,
    Upload,
    Direct,
}

impl VotInputType {
    pub fn as_str(self) -> &'static str {
        match self {
            VotInputType::Link => "link",
            VotInputType::Upload => "upload",
            VotInputType::Direct => "direct",
        }
    }
}

impl std::str::FromStr for VotInputType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "link" => Ok(VotInputType::Link),
            "upload" => Ok(VotInputType::Upload),
            "direct" => Ok(VotInputType::Direct),
            other => Err(Error::InvalidInput(format!(
                "unknown input type '{}' (link, upload, direct)",
                other
            ))),
        }
    }
}

/// Which of the two page views is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveView {
    /// VOTABLE input and parse result
    Votable,
    /// Download log
    Download,
}

/// Where the VOTABLE came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceLink {
    Unknown,
    Link(String),
}

impl ResourceLink {
    fn from_message(link_known: bool, link: &str) -> Self {
        if link_known {
            ResourceLink::Link(link.to_string())
        } else {
            ResourceLink::Unknown
        }
    }
}

/// Multi-select listing the parsed spectra
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpectraSelect {
    pub options: Vec<SelectOption>,
    /// Visible rows
    pub size: usize,
}

impl SpectraSelect {
    fn render(spectra: &[SpectrumRef]) -> Self {
        let options = spectra
            .iter()
            .enumerate()
            .map(|(position, spectrum)| SelectOption {
                value: spectrum.index().to_string(),
                label: spectrum.name().to_string(),
                selected: position == 0,
            })
            .collect();
        Self {
            options,
            size: spectra.len().min(MAX_LIST_SIZE),
        }
    }

    pub fn selected_values(&self) -> Vec<String> {
        self.options
            .iter()
            .filter(|option| option.selected)
            .map(|option| option.value.clone())
            .collect()
    }
}

/// Input widget of one DataLink parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLinkInput {
    Text(String),
    /// First option is always the empty "Nothing selected" choice
    Select {
        options: Vec<SelectOption>,
        selected: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLinkField {
    pub name: String,
    pub input: DataLinkInput,
}

impl DataLinkField {
    fn from_param(param: &DataLinkParam) -> Self {
        let input = if param.select {
            let mut options = vec![SelectOption {
                value: String::new(),
                label: "Nothing selected".to_string(),
                selected: true,
            }];
            options.extend(param.options.iter().map(|option| SelectOption {
                value: option.value.clone(),
                label: option.name.clone(),
                selected: false,
            }));
            DataLinkInput::Select {
                options,
                selected: String::new(),
            }
        } else {
            DataLinkInput::Text(String::new())
        };
        Self {
            name: param.name.clone(),
            input,
        }
    }

    pub fn value(&self) -> &str {
        match &self.input {
            DataLinkInput::Text(value) => value,
            DataLinkInput::Select { selected, .. } => selected,
        }
    }

    fn set_value(&mut self, value: &str) -> Result<()> {
        match &mut self.input {
            DataLinkInput::Text(current) => *current = value.to_string(),
            DataLinkInput::Select { options, selected } => {
                if !options.iter().any(|option| option.value == value) {
                    return Err(Error::InvalidInput(format!(
                        "'{}' is not an option of {}",
                        value, self.name
                    )));
                }
                for option in options.iter_mut() {
                    option.selected = option.value == value;
                }
                *selected = value.to_string();
            }
        }
        Ok(())
    }
}

/// DataLink form: the "Use DataLink protocol" checkbox plus one field per parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLinkForm {
    pub use_datalink: bool,
    pub fields: Vec<DataLinkField>,
}

impl DataLinkForm {
    fn render(params: &[DataLinkParam]) -> Self {
        Self {
            use_datalink: true,
            fields: params.iter().map(DataLinkField::from_param).collect(),
        }
    }

    /// Fields are greyed out while the checkbox is off
    pub fn fields_disabled(&self) -> bool {
        !self.use_datalink
    }

    fn values(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|field| (field.name.clone(), field.value().to_string()))
            .collect()
    }
}

/// One line of the download log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLogRow {
    pub file_name: String,
    pub url: String,
    pub success: bool,
    /// Failure reason, empty on success
    pub problem: String,
    pub received_at: DateTime<Local>,
}

impl DownloadLogRow {
    pub fn state(&self) -> StatusText {
        if self.success {
            StatusText::new("SUCCESS", StatusClass::Success)
        } else {
            StatusText::new("FAILED", StatusClass::Fail)
        }
    }
}

/// All downloader page state
#[derive(Debug, Clone)]
pub struct DownloaderView {
    pub active_view: ActiveView,
    pub input_type: VotInputType,
    /// Spinner shown while the server parses a VOTABLE
    pub progress_visible: bool,
    /// Continue buttons are disabled while a parse is in flight
    pub continue_disabled: bool,
    /// Parse result shown instead of the input panel
    pub votable_selected: bool,
    pub parse_success: bool,
    pub resource_url: ResourceLink,
    pub resource_url_fail: ResourceLink,
    pub record_count: Option<u64>,
    pub datalink_available: bool,
    pub query_status: Option<StatusText>,
    pub spectra_select: SpectraSelect,
    pub datalink_form: Option<DataLinkForm>,
    pub datalink_section_visible: bool,
    pub directory_field: String,
    pub error_message: String,
    pub download_log: Vec<DownloadLogRow>,
    pub download_status: Option<StatusText>,
    pub download_progress_visible: bool,
    spectra_list: Vec<SpectrumRef>,
    cookies: CookieJar,
    alerts: Vec<String>,
    outbox: Vec<DownloaderRequest>,
}

impl DownloaderView {
    /// New page; the directory field starts from the `last-directory` cookie
    pub fn new(cookies: CookieJar) -> Self {
        Self {
            active_view: ActiveView::Votable,
            input_type: VotInputType::Link,
            progress_visible: false,
            continue_disabled: false,
            votable_selected: false,
            parse_success: true,
            resource_url: ResourceLink::Unknown,
            resource_url_fail: ResourceLink::Unknown,
            record_count: None,
            datalink_available: false,
            query_status: None,
            spectra_select: SpectraSelect::default(),
            datalink_form: None,
            datalink_section_visible: false,
            directory_field: cookies.get(LAST_DIRECTORY).unwrap_or_default(),
            error_message: String::new(),
            download_log: Vec::new(),
            download_status: None,
            download_progress_visible: false,
            spectra_list: Vec::new(),
            cookies,
            alerts: Vec::new(),
            outbox: Vec::new(),
        }
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// Spectra of the last successful parse
    pub fn spectra(&self) -> &[SpectrumRef] {
        &self.spectra_list
    }

    // ---------------------------------------------------------------------
    // User actions
    // ---------------------------------------------------------------------

    pub fn select_input_type(&mut self, input_type: VotInputType) {
        self.input_type = input_type;
    }

    pub fn process_url(&mut self, url: &str) -> Result<()> {
        self.begin_parse()?;
        self.outbox.push(DownloaderRequest::VotableUrl(url.to_string()));
        Ok(())
    }

    /// Submit an uploaded VOTABLE; `None` means no file was chosen
    pub fn upload(&mut self, contents: Option<String>) -> Result<()> {
        let Some(contents) = contents else {
            self.alerts.push(NO_FILE_SELECTED_ALERT.to_string());
            return Ok(());
        };
        self.begin_parse()?;
        self.outbox.push(DownloaderRequest::VotableText(contents));
        Ok(())
    }

    pub fn process_direct(&mut self, text: &str) -> Result<()> {
        self.begin_parse()?;
        self.outbox
            .push(DownloaderRequest::VotableText(text.to_string()));
        Ok(())
    }

    fn begin_parse(&mut self) -> Result<()> {
        if self.continue_disabled {
            return Err(Error::InvalidInput(
                "a VOTABLE is already being processed".to_string(),
            ));
        }
        self.progress_visible = true;
        self.continue_disabled = true;
        Ok(())
    }

    /// Back to the VOTABLE input panel
    pub fn back(&mut self) {
        self.votable_selected = false;
        self.active_view = ActiveView::Votable;
    }

    pub fn select_spectra(&mut self, values: &[String]) -> Result<()> {
        if let Some(unknown) = values.iter().find(|value| {
            !self
                .spectra_select
                .options
                .iter()
                .any(|option| &option.value == *value)
        }) {
            return Err(Error::InvalidInput(format!("no spectrum '{}'", unknown)));
        }
        for option in self.spectra_select.options.iter_mut() {
            option.selected = values.contains(&option.value);
        }
        Ok(())
    }

    pub fn select_all(&mut self) {
        for option in self.spectra_select.options.iter_mut() {
            option.selected = true;
        }
    }

    pub fn set_use_datalink(&mut self, flag: bool) -> Result<()> {
        let form = self.datalink_form_mut()?;
        form.use_datalink = flag;
        Ok(())
    }

    pub fn set_datalink_param(&mut self, name: &str, value: &str) -> Result<()> {
        let form = self.datalink_form_mut()?;
        if form.fields_disabled() {
            return Err(Error::InvalidInput(
                "DataLink fields are disabled".to_string(),
            ));
        }
        let field = form
            .fields
            .iter_mut()
            .find(|field| field.name == name)
            .ok_or_else(|| Error::InvalidInput(format!("no DataLink parameter '{}'", name)))?;
        field.set_value(value)
    }

    fn datalink_form_mut(&mut self) -> Result<&mut DataLinkForm> {
        match (self.datalink_available, self.datalink_form.as_mut()) {
            (true, Some(form)) => Ok(form),
            _ => Err(Error::InvalidInput(
                "DataLink is not available for this VOTABLE".to_string(),
            )),
        }
    }

    pub fn set_directory(&mut self, directory: &str) {
        self.directory_field = directory.to_string();
    }

    /// Start downloading the selected spectra
    ///
    /// Blocks with an alert when nothing is selected.
    pub fn download(&mut self) {
        let spectra = self.spectra_select.selected_values();
        if spectra.is_empty() {
            self.alerts.push(NO_SPECTRUM_SELECTED_ALERT.to_string());
            return;
        }

        let datalink = match &self.datalink_form {
            Some(form) if self.datalink_available && form.use_datalink => Some(form.values()),
            _ => None,
        };
        let request = DownloadRequest {
            spectra,
            use_datalink: datalink.is_some(),
            datalink,
            directory: self.directory_field.clone(),
        };

        if let Err(e) = self.cookies.set(LAST_DIRECTORY, &request.directory) {
            warn!("Could not persist {} cookie: {}", LAST_DIRECTORY, e);
        }

        self.download_log.clear();
        self.download_status = None;
        self.download_progress_visible = true;
        self.active_view = ActiveView::Download;
        self.outbox.push(DownloaderRequest::DownloadSpectra(request));
    }

    // ---------------------------------------------------------------------
    // Server messages
    // ---------------------------------------------------------------------

    pub fn on_votable_parsed(&mut self, parsed: VotableParsed) {
        if parsed.success {
            self.parse_success = true;
            self.resource_url = ResourceLink::from_message(parsed.link_known, &parsed.link);
            self.record_count = parsed.record_count;
            let status = parsed.query_status.unwrap_or_default();
            let class = if status == "OK" {
                StatusClass::Success
            } else {
                StatusClass::Fail
            };
            self.query_status = Some(StatusText::new(status, class));

            self.spectra_list = parsed.spectra.unwrap_or_default();
            self.spectra_select = SpectraSelect::render(&self.spectra_list);

            if parsed.datalink_available.unwrap_or(false) {
                self.datalink_available = true;
                let params = parsed.datalink.unwrap_or_default();
                self.datalink_form = Some(DataLinkForm::render(&params));
                self.datalink_section_visible = true;
            } else {
                self.datalink_available = false;
                self.datalink_form = None;
                self.datalink_section_visible = false;
            }
            if let Some(directory) = parsed.directory {
                self.directory_field = directory;
            }
            debug!("VOTABLE parsed with {} spectra", self.spectra_list.len());
        } else {
            self.parse_success = false;
            self.resource_url_fail = ResourceLink::from_message(parsed.link_known, &parsed.link);
            self.error_message = parsed.exception.unwrap_or_default();
        }

        self.progress_visible = false;
        self.continue_disabled = false;
        self.votable_selected = true;
    }

    pub fn on_spectrum_downloaded(&mut self, result: SpectrumDownloaded) {
        let problem = if result.success {
            String::new()
        } else {
            result.exception.unwrap_or_default()
        };
        self.download_log.push(DownloadLogRow {
            file_name: result.file_name,
            url: result.url,
            success: result.success,
            problem,
            received_at: Local::now(),
        });
    }

    pub fn on_spectra_downloaded(&mut self, success: bool) {
        self.download_status = Some(if success {
            StatusText::new("All spectra successfully downloaded", StatusClass::Success)
        } else {
            StatusText::new(
                "At least one spectrum was not downloaded",
                StatusClass::Fail,
            )
        });
        self.download_progress_visible = false;
    }
}

impl ViewController for DownloaderView {
    type Request = DownloaderRequest;
    type Command = DownloaderCommand;

    const NAMESPACE: &'static str = DOWNLOADER_NAMESPACE;

    fn dispatcher() -> Dispatcher<Self> {
        Dispatcher::new()
            .on(VOTABLE_PARSED, DownloaderView::on_votable_parsed)
            .on(SPECTRUM_DOWNLOADED, DownloaderView::on_spectrum_downloaded)
            .on(SPECTRA_DOWNLOADED, DownloaderView::on_spectra_downloaded)
    }

    fn apply(&mut self, command: DownloaderCommand) -> Result<()> {
        match command {
            DownloaderCommand::InputType(input_type) => self.select_input_type(input_type),
            DownloaderCommand::ProcessUrl(url) => self.process_url(&url)?,
            DownloaderCommand::Upload(path) => {
                let contents = match path {
                    Some(path) => Some(std::fs::read_to_string(&path)?),
                    None => None,
                };
                self.upload(contents)?;
            }
            DownloaderCommand::ProcessDirect(text) => self.process_direct(&text)?,
            DownloaderCommand::Back => self.back(),
            DownloaderCommand::Select(values) => self.select_spectra(&values)?,
            DownloaderCommand::SelectAll => self.select_all(),
            DownloaderCommand::UseDataLink(flag) => self.set_use_datalink(flag)?,
            DownloaderCommand::DataLinkParam { name, value } => {
                self.set_datalink_param(&name, &value)?
            }
            DownloaderCommand::Directory(directory) => self.set_directory(&directory),
            DownloaderCommand::Download => self.download(),
        }
        Ok(())
    }

    fn take_outbox(&mut self) -> Vec<DownloaderRequest> {
        std::mem::take(&mut self.outbox)
    }

    fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }

    fn disconnected(&mut self) {
        self.alerts.push(DISCONNECTED_ALERT.to_string());
    }
}
