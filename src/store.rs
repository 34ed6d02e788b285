//! Profile store backed by a single YAML document.
//!
//! The document root maps sanitized device names to their profile:
//!
//! ```yaml
//! Launchkey Mini:
//!   Properties:
//!     - Midi Message Type: 1
//!       Midi Action Type: 2
//!       Toggle: true
//!       Console Command: ""
//!       Open File Path: ""
//!       Midi Message: [144, 60, 127]
//!   Initial Output Midi Messages:
//!     - [159, 12, 127]
//! ```
//!
//! Every write is a read-modify-write of the whole document so other
//! profiles survive, and goes through a temporary file that is renamed over
//! the existing file.

use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::midi::RawMessage;
use crate::paths::AppPaths;
use crate::profile::{ActionType, Binding, DeviceProfile, MidiMessageType};

const PROPERTIES_KEY: &str = "Properties";
const INITIAL_OUTPUT_KEY: &str = "Initial Output Midi Messages";

const MESSAGE_TYPE_KEY: &str = "Midi Message Type";
const ACTION_TYPE_KEY: &str = "Midi Action Type";
const TOGGLE_KEY: &str = "Toggle";
const CONSOLE_COMMAND_KEY: &str = "Console Command";
const OPEN_FILE_PATH_KEY: &str = "Open File Path";
const MESSAGE_KEY: &str = "Midi Message";

/// Persisted fields of one binding
#[derive(Debug, Serialize)]
struct StoredBinding<'a> {
    #[serde(rename = "Midi Message Type")]
    message_type: u8,
    #[serde(rename = "Midi Action Type")]
    action_type: u8,
    #[serde(rename = "Toggle")]
    toggle: bool,
    #[serde(rename = "Console Command")]
    console_command: &'a str,
    #[serde(rename = "Open File Path")]
    open_file_path: &'a str,
    #[serde(rename = "Midi Message")]
    message: RawMessage,
}

impl<'a> From<&'a Binding> for StoredBinding<'a> {
    fn from(binding: &'a Binding) -> Self {
        Self {
            message_type: binding.message_type.code(),
            action_type: binding.action_type.code(),
            toggle: binding.toggle,
            console_command: &binding.console_command,
            open_file_path: &binding.open_file_path,
            message: binding.message,
        }
    }
}

/// Durable mapping from device name to bindings and initial messages
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    /// Store backed by `path`. Nothing is touched until the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store in the resolved config directory, creating it on first use.
    pub fn open(paths: &AppPaths) -> Result<Self> {
        paths.ensure_exists()?;
        info!("Using profiles file {}", paths.profiles.display());
        Ok(Self::new(&paths.profiles))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if the document has an entry for `name`.
    ///
    /// An unreadable document answers `false`.
    pub fn has(&self, name: &str) -> bool {
        match self.read_document() {
            Ok(document) => document.contains_key(name),
            Err(e) => {
                warn!("Cannot check for profile '{}': {}", name, e);
                false
            }
        }
    }

    /// Names of all stored profiles, in document order
    pub fn profile_names(&self) -> Result<Vec<String>> {
        let document = self.read_document()?;
        Ok(document
            .keys()
            .filter_map(|key| key.as_str().map(str::to_string))
            .collect())
    }

    /// Create or replace the entry for `profile.name`.
    ///
    /// Unrelated profiles and unknown keys inside this profile's entry are
    /// kept. Transient binding state is never written.
    pub fn save(&self, profile: &DeviceProfile) -> Result<()> {
        let mut document = self.read_document()?;

        let properties = profile
            .bindings
            .iter()
            .map(StoredBinding::from)
            .collect::<Vec<_>>();
        let properties =
            serde_yaml::to_value(properties).map_err(|e| Error::format(&self.path, e))?;
        let initial = serde_yaml::to_value(&profile.initial_output_messages)
            .map_err(|e| Error::format(&self.path, e))?;

        let key = Value::String(profile.name.clone());
        if !document.get(&key).is_some_and(Value::is_mapping) {
            document.insert(key.clone(), Value::Mapping(Mapping::new()));
        }
        if let Some(Value::Mapping(node)) = document.get_mut(&key) {
            node.insert(Value::String(PROPERTIES_KEY.to_string()), properties);
            node.insert(Value::String(INITIAL_OUTPUT_KEY.to_string()), initial);
        }

        self.write_document(&document)?;
        info!(
            "Saved profile '{}' ({} bindings, {} initial messages) into {}",
            profile.name,
            profile.bindings.len(),
            profile.initial_output_messages.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Replace `profile`'s bindings and initial messages with the stored ones.
    ///
    /// A missing file or a missing entry leaves the profile unchanged.
    /// Missing or malformed fields keep their defaults.
    pub fn load(&self, profile: &mut DeviceProfile) -> Result<()> {
        let document = self.read_document()?;
        let Some(node) = document.get(profile.name.as_str()) else {
            debug!("No stored profile for '{}'", profile.name);
            return Ok(());
        };

        profile.bindings = node
            .get(PROPERTIES_KEY)
            .and_then(Value::as_sequence)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| decode_binding(&profile.name, entry))
                    .collect()
            })
            .unwrap_or_default();

        profile.initial_output_messages = node
            .get(INITIAL_OUTPUT_KEY)
            .and_then(Value::as_sequence)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let message = decode_message(entry);
                        if message.is_none() {
                            warn!(
                                "Skipping malformed initial message in profile '{}': {:?}",
                                profile.name, entry
                            );
                        }
                        message
                    })
                    .collect()
            })
            .unwrap_or_default();

        info!(
            "Loaded profile '{}' ({} bindings, {} initial messages) from {}",
            profile.name,
            profile.bindings.len(),
            profile.initial_output_messages.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Delete the entry for `profile.name`. Missing entries are not an error.
    pub fn remove(&self, profile: &DeviceProfile) -> Result<()> {
        let document = self.read_document()?;
        if !document.contains_key(profile.name.as_str()) {
            debug!("No stored profile '{}' to remove", profile.name);
            return Ok(());
        }

        let document: Mapping = document
            .into_iter()
            .filter(|(key, _)| key.as_str() != Some(profile.name.as_str()))
            .collect();
        self.write_document(&document)?;
        info!(
            "Removed profile '{}' from {}",
            profile.name,
            self.path.display()
        );
        Ok(())
    }

    fn read_document(&self) -> Result<Mapping> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Mapping::new()),
            Err(e) => return Err(Error::io(&self.path, e)),
        };

        if content.trim().is_empty() {
            return Ok(Mapping::new());
        }

        match serde_yaml::from_str::<Value>(&content).map_err(|e| Error::format(&self.path, e))? {
            Value::Mapping(document) => Ok(document),
            Value::Null => Ok(Mapping::new()),
            _ => Err(Error::format(
                &self.path,
                serde::de::Error::custom("document root is not a map"),
            )),
        }
    }

    fn write_document(&self, document: &Mapping) -> Result<()> {
        let content = if document.is_empty() {
            String::new()
        } else {
            serde_yaml::to_string(document).map_err(|e| Error::format(&self.path, e))?
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        fs::write(&temp_path, content).map_err(|e| Error::io(&temp_path, e))?;
        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            Error::io(&self.path, e)
        })
    }
}

fn decode_binding(owner: &str, node: &Value) -> Binding {
    let mut binding = Binding::new(owner);

    if let Some(code) = read_u8(node, MESSAGE_TYPE_KEY) {
        binding.message_type = MidiMessageType::from_code(code);
    }
    if let Some(code) = read_u8(node, ACTION_TYPE_KEY) {
        binding.action_type = ActionType::from_code(code);
    }
    if let Some(toggle) = node.get(TOGGLE_KEY).and_then(Value::as_bool) {
        binding.toggle = toggle;
    }
    if let Some(command) = node.get(CONSOLE_COMMAND_KEY).and_then(Value::as_str) {
        binding.console_command = command.to_string();
    }
    if let Some(path) = node.get(OPEN_FILE_PATH_KEY).and_then(Value::as_str) {
        binding.open_file_path = path.to_string();
    }
    if let Some(message) = node.get(MESSAGE_KEY).and_then(decode_message) {
        binding.message = message;
    }

    binding
}

fn read_u8(node: &Value, key: &str) -> Option<u8> {
    node.get(key)
        .and_then(Value::as_u64)
        .and_then(|v| u8::try_from(v).ok())
}

fn decode_message(node: &Value) -> Option<RawMessage> {
    let bytes = node
        .as_sequence()?
        .iter()
        .map(|b| b.as_u64().and_then(|v| u8::try_from(v).ok()))
        .collect::<Option<Vec<u8>>>()?;
    bytes.as_slice().try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn make_store() -> (TempDir, ProfileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("profiles.yaml"));
        (dir, store)
    }

    fn make_profile(name: &str) -> DeviceProfile {
        let mut profile = DeviceProfile::new(name, 1, 2);

        let id = profile.add_binding();
        let binding = profile.binding_mut(id).unwrap();
        binding.message_type = MidiMessageType::NoteOnOff;
        binding.action_type = ActionType::ConsoleCommand;
        binding.console_command = "echo {V}".to_string();
        binding.toggle = true;
        binding.message = [0x90, 0x3C, 0x7F];
        binding.is_recording = true;
        binding.is_toggle_active = true;

        let id = profile.add_binding();
        let binding = profile.binding_mut(id).unwrap();
        binding.message_type = MidiMessageType::ControlChange;
        binding.action_type = ActionType::Volume;
        binding.message = [0xB0, 0x07, 0x40];

        let id = profile.add_binding();
        let binding = profile.binding_mut(id).unwrap();
        binding.message_type = MidiMessageType::NoteOnOff;
        binding.action_type = ActionType::OpenFile;
        binding.open_file_path = "/tmp/some script.sh".to_string();
        binding.message = [0x91, 0x24, 0x01];

        profile.add_initial_output_message([0x9F, 0x0C, 0x7F]);
        profile.add_initial_output_message([0xB0, 0x00, 0x00]);
        profile
    }

    #[test]
    fn test_save_load_round_trip() {
        let (_dir, store) = make_store();
        let saved = make_profile("Launchkey Mini");
        store.save(&saved).unwrap();

        let mut loaded = DeviceProfile::new("Launchkey Mini", 7, 8);
        store.load(&mut loaded).unwrap();

        assert_eq!(loaded.bindings.len(), saved.bindings.len());
        for (a, b) in saved.bindings.iter().zip(&loaded.bindings) {
            assert!(a.same_persisted_fields(b), "{:?} != {:?}", a, b);
            assert_ne!(a.id(), b.id());
            assert!(!b.is_recording);
            assert!(!b.is_toggle_active);
        }
        assert_eq!(loaded.initial_output_messages, saved.initial_output_messages);
        assert_eq!(loaded.input_port(), 7);
    }

    #[test]
    fn test_save_keeps_other_profiles() {
        let (_dir, store) = make_store();
        store.save(&make_profile("Device B")).unwrap();

        let mut a = make_profile("Device A");
        a.bindings.truncate(1);
        store.save(&a).unwrap();
        a.bindings.clear();
        store.save(&a).unwrap();

        let mut b = DeviceProfile::detached("Device B");
        store.load(&mut b).unwrap();
        assert_eq!(b.bindings.len(), 3);
        assert_eq!(b.initial_output_messages.len(), 2);

        assert_eq!(
            store.profile_names().unwrap(),
            vec!["Device B".to_string(), "Device A".to_string()]
        );
    }

    #[test]
    fn test_load_missing_file_or_profile_is_noop() {
        let (_dir, store) = make_store();
        let mut profile = DeviceProfile::detached("Nothing");
        let id = profile.add_binding();

        store.load(&mut profile).unwrap();
        assert!(profile.binding(id).is_some());

        store.save(&make_profile("Other")).unwrap();
        store.load(&mut profile).unwrap();
        assert!(profile.binding(id).is_some());
    }

    #[test]
    fn test_empty_file_is_empty_map() {
        let (_dir, store) = make_store();
        fs::write(store.path(), "").unwrap();
        assert!(!store.has("Pad"));

        store.save(&make_profile("Pad")).unwrap();
        assert!(store.has("Pad"));
    }

    #[test]
    fn test_load_tolerates_missing_and_unknown_keys() {
        let (_dir, store) = make_store();
        fs::write(
            store.path(),
            "Pad:\n  Color: red\n  Properties:\n    - Midi Action Type: 1\n      Midi Message: [176, 7, 0]\n      Future Field: 3\n    - Toggle: true\n      Midi Message Type: 9\n",
        )
        .unwrap();

        let mut profile = DeviceProfile::detached("Pad");
        store.load(&mut profile).unwrap();

        assert_eq!(profile.bindings.len(), 2);
        assert_eq!(profile.bindings[0].action_type, ActionType::Volume);
        assert_eq!(profile.bindings[0].message, [176, 7, 0]);
        assert_eq!(profile.bindings[0].message_type, MidiMessageType::None);
        assert!(profile.bindings[1].toggle);
        assert_eq!(profile.bindings[1].message_type, MidiMessageType::None);
        assert_eq!(profile.bindings[1].message, [0, 0, 0]);
        assert!(profile.initial_output_messages.is_empty());
    }

    #[test]
    fn test_save_keeps_unknown_profile_keys() {
        let (_dir, store) = make_store();
        fs::write(store.path(), "Pad:\n  Color: red\n").unwrap();

        store.save(&make_profile("Pad")).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        let document: Value = serde_yaml::from_str(&content).unwrap();
        assert_eq!(document["Pad"]["Color"].as_str(), Some("red"));
        assert_eq!(
            document["Pad"][PROPERTIES_KEY].as_sequence().map(Vec::len),
            Some(3)
        );
    }

    #[test]
    fn test_remove() {
        let (_dir, store) = make_store();
        store.save(&make_profile("A")).unwrap();
        store.save(&make_profile("B")).unwrap();

        store.remove(&DeviceProfile::detached("A")).unwrap();
        assert!(!store.has("A"));
        assert!(store.has("B"));

        // Removing again, or from a missing file, is fine
        store.remove(&DeviceProfile::detached("A")).unwrap();
        store.remove(&DeviceProfile::detached("B")).unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "");

        let (_dir, empty) = make_store();
        empty.remove(&DeviceProfile::detached("A")).unwrap();
        assert!(!empty.path().exists());
    }

    #[test]
    fn test_malformed_document_is_left_untouched() {
        let (_dir, store) = make_store();
        let garbage = "just a scalar\n";
        fs::write(store.path(), garbage).unwrap();

        let err = store.save(&make_profile("Pad")).unwrap_err();
        assert!(matches!(err, Error::ProfileFormat { .. }));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), garbage);

        let mut profile = DeviceProfile::detached("Pad");
        assert!(store.load(&mut profile).is_err());
        assert!(!store.has("Pad"));
    }

    #[test]
    fn test_unreadable_path_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in place of the file cannot be read as text
        let store = ProfileStore::new(dir.path());
        let err = store.save(&make_profile("Pad")).unwrap_err();
        assert!(matches!(err, Error::IoFailure { .. }));
    }

    fn arb_binding() -> impl Strategy<Value = (u8, u8, bool, String, String, RawMessage)> {
        (
            0u8..3,
            0u8..5,
            any::<bool>(),
            "[a-z][a-z {}V/._-]{0,15}",
            "[a-z/._ ]{0,16}",
            any::<[u8; 3]>(),
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_save_load_reproduces_profile(
            bindings in prop::collection::vec(arb_binding(), 1..6),
            initial in prop::collection::vec(any::<[u8; 3]>(), 0..4),
        ) {
            let (_dir, store) = make_store();
            let mut saved = DeviceProfile::new("Device", 0, 0);
            for (message_type, action_type, toggle, command, path, message) in bindings {
                let id = saved.add_binding();
                let binding = saved.binding_mut(id).unwrap();
                binding.message_type = MidiMessageType::from_code(message_type);
                binding.action_type = ActionType::from_code(action_type);
                binding.toggle = toggle;
                binding.console_command = command;
                binding.open_file_path = path;
                binding.message = message;
            }
            saved.initial_output_messages = initial;
            store.save(&saved).unwrap();

            let mut loaded = DeviceProfile::new("Device", 0, 0);
            store.load(&mut loaded).unwrap();

            prop_assert_eq!(loaded.bindings.len(), saved.bindings.len());
            for (a, b) in saved.bindings.iter().zip(&loaded.bindings) {
                prop_assert!(a.same_persisted_fields(b), "{:?} != {:?}", a, b);
            }
            prop_assert_eq!(loaded.initial_output_messages, saved.initial_output_messages);
        }
    }
}
