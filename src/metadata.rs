use crate::error::ParseError;
use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
};

pub const MODINFO_EXTENSION: &str = "modinfo";
pub const LOC_PREFIX: &str = "LOC_";
const DEFAULT_LOCALIZATION_FILE: &str = "text/en_us/ModuleText.xml";

/// Package ids that ship with the game. They never count as dependencies.
pub const BASE_GAME_MODS: &[&str] = &[
    "age-antiquity",
    "age-exploration",
    "age-modern",
    "base-standard",
    "core",
    "telemetry",
];

pub const DLC_MODS: &[&str] = &[
    "ashoka-himiko-alt",
    "ashoka-himiko-alt-shell",
    "boot-shell",
    "friedrich-xerxes-alt",
    "friedrich-xerxes-alt-shell",
    "napoleon",
    "napoleon-alt",
    "napoleon-alt-shell",
    "napoleon-shell",
    "shawnee-tecumseh",
    "shawnee-tecumseh-shell",
];

pub fn is_builtin_package(id: &str) -> bool {
    BASE_GAME_MODS.contains(&id) || DLC_MODS.contains(&id)
}

/// File actions a `.modinfo` can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionKind {
    UpdateDatabase,
    UpdateText,
    UIScripts,
    ImportFiles,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::UpdateDatabase,
        ActionKind::UpdateText,
        ActionKind::UIScripts,
        ActionKind::ImportFiles,
    ];

    pub fn element_name(self) -> &'static str {
        match self {
            ActionKind::UpdateDatabase => "UpdateDatabase",
            ActionKind::UpdateText => "UpdateText",
            ActionKind::UIScripts => "UIScripts",
            ActionKind::ImportFiles => "ImportFiles",
        }
    }

    pub fn from_element_name(name: &str) -> Option<Self> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.element_name() == name)
    }

    /// Asset replacement actions. Database and text updates are additive
    /// and may overlap freely.
    pub fn participates_in_conflicts(self) -> bool {
        matches!(self, ActionKind::UIScripts | ActionKind::ImportFiles)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModDescriptor {
    pub mod_id: String,
    pub display_name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub authors: String,
    #[serde(default)]
    pub description: String,
    pub affects_saves: bool,
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
    #[serde(default)]
    pub affected_files: BTreeMap<ActionKind, BTreeSet<String>>,
    pub source_path: PathBuf,
}

impl ModDescriptor {
    pub fn files(&self, kind: ActionKind) -> impl Iterator<Item = &str> {
        self.affected_files
            .get(&kind)
            .into_iter()
            .flat_map(|files| files.iter().map(String::as_str))
    }

    /// Files from the buckets that take part in conflict detection.
    pub fn conflict_files(&self) -> BTreeSet<&str> {
        ActionKind::ALL
            .into_iter()
            .filter(|kind| kind.participates_in_conflicts())
            .flat_map(|kind| self.files(kind))
            .collect()
    }

    pub fn has_effect(&self) -> bool {
        self.affected_files.values().any(|files| !files.is_empty())
    }

    pub fn with_source_path(mut self, path: PathBuf) -> Self {
        self.source_path = path;
        self
    }
}

pub fn parse_modinfo(path: &Path) -> Result<ModDescriptor, ParseError> {
    let mod_root = path.parent().unwrap_or_else(|| Path::new(""));
    parse_modinfo_named(path, &folder_name_of(mod_root))
}

/// Like [`parse_modinfo`], with an explicit display name fallback. Used when
/// the mod root has been renamed since it came out of the archive.
pub fn parse_modinfo_named(path: &Path, folder_name: &str) -> Result<ModDescriptor, ParseError> {
    let raw = read_modinfo_file(path)?;
    let mod_root = path.parent().unwrap_or_else(|| Path::new(""));
    parse_document(&raw, mod_root, folder_name)
}

/// Parses `.modinfo` xml. `mod_root` is the directory holding the file; it
/// anchors localization lookups and the display name fallback.
pub fn parse_modinfo_str(xml: &str, mod_root: &Path) -> Result<ModDescriptor, ParseError> {
    parse_document(xml, mod_root, &folder_name_of(mod_root))
}

/// Root `id` attribute only, without validating the rest of the document.
pub fn read_mod_id(path: &Path) -> Option<String> {
    let raw = fs::read_to_string(path).ok()?;
    let mut reader = Reader::from_str(raw.trim_start_matches('\u{feff}'));
    reader.trim_text(true);
    loop {
        match reader.read_event().ok()? {
            Event::Start(e) | Event::Empty(e) => {
                return attr_value(&e, b"id")
                    .map(|id| id.trim().to_string())
                    .filter(|id| !id.is_empty());
            }
            Event::Eof => return None,
            _ => {}
        }
    }
}

fn read_modinfo_file(path: &Path) -> Result<String, ParseError> {
    fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn folder_name_of(mod_root: &Path) -> String {
    mod_root
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn parse_document(
    xml: &str,
    mod_root: &Path,
    folder_name: &str,
) -> Result<ModDescriptor, ParseError> {
    let raw = read_raw_modinfo(xml.trim_start_matches('\u{feff}'))?;

    let mod_id = raw
        .mod_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or(ParseError::MissingId)?;
    if !raw.has_properties {
        return Err(ParseError::MissingProperties);
    }
    let raw_name = raw.name.ok_or(ParseError::MissingName)?;
    if raw.affected_files.values().all(|files| files.is_empty()) {
        return Err(ParseError::NoEffect);
    }

    let display_name = resolve_display_name(
        &raw_name,
        &raw.localization_files,
        mod_root,
        folder_name,
        &mod_id,
    );
    let affects_saves = raw
        .affects_saves
        .map(|value| value.trim() != "0")
        .unwrap_or(true);

    Ok(ModDescriptor {
        mod_id,
        display_name,
        version: raw.version.unwrap_or_default(),
        authors: raw.authors.unwrap_or_default(),
        description: raw.description.unwrap_or_default(),
        affects_saves,
        dependencies: raw.dependencies,
        affected_files: raw.affected_files,
        source_path: mod_root.to_path_buf(),
    })
}

#[derive(Debug, Default)]
struct RawModInfo {
    mod_id: Option<String>,
    version: Option<String>,
    has_properties: bool,
    name: Option<String>,
    authors: Option<String>,
    description: Option<String>,
    affects_saves: Option<String>,
    dependencies: BTreeSet<String>,
    affected_files: BTreeMap<ActionKind, BTreeSet<String>>,
    localization_files: Vec<String>,
}

impl RawModInfo {
    fn open_element(&mut self, stack: &[String], local: &str, e: &BytesStart<'_>) {
        if stack.is_empty() {
            self.mod_id = attr_value(e, b"id");
            self.version = attr_value(e, b"version");
            return;
        }
        match local {
            "Properties" if stack.len() == 1 => self.has_properties = true,
            "Mod" if stack.iter().any(|node| node == "Dependencies") => {
                if let Some(id) = attr_value(e, b"id") {
                    let id = id.trim();
                    if !id.is_empty() && !is_builtin_package(id) {
                        self.dependencies.insert(id.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    // `stack` still includes the element being closed.
    fn close_element(&mut self, stack: &[String], text: &str) {
        let Some((local, ancestors)) = stack.split_last() else {
            return;
        };
        let parent = ancestors.last().map(String::as_str);
        let text = text.trim();

        if parent == Some("Properties") && ancestors.len() == 2 {
            let slot = match local.as_str() {
                "Name" => &mut self.name,
                "Authors" => &mut self.authors,
                "Description" => &mut self.description,
                "AffectsSavedGames" => &mut self.affects_saves,
                _ => return,
            };
            if slot.is_none() {
                *slot = Some(text.to_string());
            }
            return;
        }

        match local.as_str() {
            "Item" => {
                if text.is_empty() {
                    return;
                }
                let in_actions = ancestors.iter().any(|node| node == "ActionGroup")
                    && ancestors.iter().any(|node| node == "Actions");
                if !in_actions {
                    return;
                }
                let kind = ancestors
                    .iter()
                    .rev()
                    .find_map(|node| ActionKind::from_element_name(node));
                if let Some(kind) = kind {
                    self.affected_files
                        .entry(kind)
                        .or_default()
                        .insert(text.to_string());
                }
            }
            "File" if parent == Some("LocalizedText") && !text.is_empty() => {
                self.localization_files.push(text.to_string());
            }
            _ => {}
        }
    }
}

fn read_raw_modinfo(xml: &str) -> Result<RawModInfo, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut raw = RawModInfo::default();
    let mut prefix: Option<String> = None;
    let mut stack: Vec<String> = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let local = local_name(&e, &mut prefix, stack.is_empty());
                raw.open_element(&stack, &local, &e);
                stack.push(local);
                text.clear();
            }
            Event::Empty(e) => {
                let local = local_name(&e, &mut prefix, stack.is_empty());
                raw.open_element(&stack, &local, &e);
                stack.push(local);
                raw.close_element(&stack, "");
                stack.pop();
                text.clear();
            }
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::End(_) => {
                raw.close_element(&stack, &text);
                stack.pop();
                text.clear();
                if stack.is_empty() {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(raw)
}

/// Strips the root element's namespace prefix. The root decides the prefix;
/// descendants without it are foreign and come back as an empty name.
fn local_name(e: &BytesStart<'_>, prefix: &mut Option<String>, is_root: bool) -> String {
    let qname = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    if is_root {
        *prefix = qname
            .split_once(':')
            .map(|(ns, _)| format!("{ns}:"));
    }
    match prefix.as_deref() {
        Some(prefix) => qname
            .strip_prefix(prefix)
            .map(str::to_string)
            .unwrap_or_default(),
        None => qname,
    }
}

fn resolve_display_name(
    raw_name: &str,
    localization_files: &[String],
    mod_root: &Path,
    folder_name: &str,
    mod_id: &str,
) -> String {
    let folder_name = if folder_name.is_empty() {
        mod_id.to_string()
    } else {
        folder_name.to_string()
    };

    if raw_name.is_empty() {
        return folder_name;
    }
    if !raw_name.starts_with(LOC_PREFIX) {
        return raw_name.to_string();
    }

    for candidate in localization_candidates(localization_files, mod_root) {
        if let Some(localized) = lookup_localized_text(&candidate, raw_name) {
            return localized;
        }
    }
    log::debug!("no en_us text for {raw_name}, using folder name {folder_name}");
    folder_name
}

fn localization_candidates(declared: &[String], mod_root: &Path) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = declared
        .iter()
        .filter(|file| file.to_ascii_lowercase().contains("en_us"))
        .map(|file| mod_root.join(file.replace('\\', "/")))
        .collect();
    let fallback = mod_root.join(DEFAULT_LOCALIZATION_FILE);
    if !out.contains(&fallback) {
        out.push(fallback);
    }
    out
}

/// Finds `EnglishText/Row[@Tag = tag]` and returns its text, taken from a
/// `Text` child or a `Text` attribute.
pub fn lookup_localized_text(path: &Path, tag: &str) -> Option<String> {
    let raw = fs::read_to_string(path).ok()?;
    let mut reader = Reader::from_str(raw.trim_start_matches('\u{feff}'));
    reader.trim_text(true);

    let mut in_english = false;
    let mut in_row = false;
    let mut in_text = false;
    let mut text = String::new();

    loop {
        match reader.read_event().ok()? {
            Event::Start(e) => match e.name().as_ref() {
                b"EnglishText" => in_english = true,
                b"Row" if in_english => {
                    if attr_value(&e, b"Tag").as_deref() == Some(tag) {
                        if let Some(value) = attr_value(&e, b"Text") {
                            return non_empty(&value);
                        }
                        in_row = true;
                    }
                }
                b"Text" if in_row => {
                    in_text = true;
                    text.clear();
                }
                _ => {}
            },
            Event::Empty(e) => {
                if in_english
                    && e.name().as_ref() == b"Row"
                    && attr_value(&e, b"Tag").as_deref() == Some(tag)
                {
                    return attr_value(&e, b"Text").and_then(|value| non_empty(&value));
                }
            }
            Event::Text(t) if in_text => text.push_str(&t.unescape().ok()?),
            Event::CData(c) if in_text => {
                text.push_str(&String::from_utf8_lossy(&c.into_inner()))
            }
            Event::End(e) => match e.name().as_ref() {
                b"Text" if in_text => return non_empty(&text),
                b"Row" if in_row => return None,
                b"EnglishText" => in_english = false,
                _ => {}
            },
            Event::Eof => return None,
            _ => {}
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            if let Ok(value) = attr.unescape_value() {
                return Some(value.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FULL_MODINFO: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Mod id="better-panels" version="1.2">
  <Properties>
    <Name>Better Panels</Name>
    <Description>Cleaner city panels</Description>
    <Authors>Ada</Authors>
    <AffectsSavedGames>0</AffectsSavedGames>
  </Properties>
  <Dependencies>
    <Mod id="base-standard" title="LOC_MODULE_BASE_STANDARD_NAME"/>
    <Mod id="napoleon" title="Napoleon"/>
    <Mod id="ui-framework" title="UI Framework"/>
  </Dependencies>
  <ActionGroups>
    <ActionGroup id="game" scope="game" criteria="always">
      <Actions>
        <UpdateDatabase>
          <Item>data/units.xml</Item>
        </UpdateDatabase>
        <UIScripts>
          <Item>ui/panel.js</Item>
          <Item>  ui/city.js  </Item>
          <Item></Item>
        </UIScripts>
        <ImportFiles>
          <Item><![CDATA[textures/icon.png]]></Item>
        </ImportFiles>
      </Actions>
    </ActionGroup>
  </ActionGroups>
</Mod>"#;

    #[test]
    fn parses_complete_modinfo() {
        let descriptor = parse_modinfo_str(FULL_MODINFO, Path::new("mods/BetterPanels")).unwrap();
        assert_eq!(descriptor.mod_id, "better-panels");
        assert_eq!(descriptor.display_name, "Better Panels");
        assert_eq!(descriptor.version, "1.2");
        assert_eq!(descriptor.authors, "Ada");
        assert_eq!(descriptor.description, "Cleaner city panels");
        assert!(!descriptor.affects_saves);
        assert_eq!(
            descriptor.dependencies,
            BTreeSet::from(["ui-framework".to_string()])
        );
        let ui: Vec<&str> = descriptor.files(ActionKind::UIScripts).collect();
        assert_eq!(ui, vec!["ui/city.js", "ui/panel.js"]);
        let imports: Vec<&str> = descriptor.files(ActionKind::ImportFiles).collect();
        assert_eq!(imports, vec!["textures/icon.png"]);
        assert_eq!(descriptor.files(ActionKind::UpdateText).count(), 0);
        assert_eq!(
            descriptor.conflict_files(),
            BTreeSet::from(["textures/icon.png", "ui/city.js", "ui/panel.js"])
        );
        assert!(descriptor.has_effect());
        assert_eq!(descriptor.source_path, PathBuf::from("mods/BetterPanels"));
    }

    #[test]
    fn optional_fields_default() {
        let xml = r#"<Mod id="tiny">
  <Properties><Name>Tiny</Name></Properties>
  <ActionGroup><Actions><UpdateText><Item>text/en.xml</Item></UpdateText></Actions></ActionGroup>
</Mod>"#;
        let descriptor = parse_modinfo_str(xml, Path::new("Tiny")).unwrap();
        assert_eq!(descriptor.version, "");
        assert_eq!(descriptor.authors, "");
        assert_eq!(descriptor.description, "");
        assert!(descriptor.affects_saves);
        assert!(descriptor.dependencies.is_empty());
    }

    #[test]
    fn handles_namespaced_documents() {
        let xml = r#"<m:Mod xmlns:m="urn:civ" id="ns-mod">
  <m:Properties><m:Name>Namespaced</m:Name><Name>Foreign</Name></m:Properties>
  <m:ActionGroup><m:Actions><m:ImportFiles><m:Item>art/a.dds</m:Item></m:ImportFiles></m:Actions></m:ActionGroup>
</m:Mod>"#;
        let descriptor = parse_modinfo_str(xml, Path::new("Ns")).unwrap();
        assert_eq!(descriptor.mod_id, "ns-mod");
        assert_eq!(descriptor.display_name, "Namespaced");
        assert_eq!(
            descriptor.files(ActionKind::ImportFiles).collect::<Vec<_>>(),
            vec!["art/a.dds"]
        );
    }

    #[test]
    fn required_elements_are_enforced() {
        let missing_id = r#"<Mod><Properties><Name>x</Name></Properties></Mod>"#;
        assert!(matches!(
            parse_modinfo_str(missing_id, Path::new("x")),
            Err(ParseError::MissingId)
        ));

        let missing_properties = r#"<Mod id="x"><ActionGroup/></Mod>"#;
        assert!(matches!(
            parse_modinfo_str(missing_properties, Path::new("x")),
            Err(ParseError::MissingProperties)
        ));

        let missing_name = r#"<Mod id="x"><Properties><Authors>a</Authors></Properties></Mod>"#;
        assert!(matches!(
            parse_modinfo_str(missing_name, Path::new("x")),
            Err(ParseError::MissingName)
        ));
    }

    #[test]
    fn only_top_level_properties_describe_the_mod() {
        let nested_only = r#"<Mod id="x"><ActionGroups><ActionGroup>
  <Properties><LoadOrder>1</LoadOrder><Name>Group Name</Name></Properties>
  <Actions><UIScripts><Item>ui/a.js</Item></UIScripts></Actions>
</ActionGroup></ActionGroups></Mod>"#;
        assert!(matches!(
            parse_modinfo_str(nested_only, Path::new("x")),
            Err(ParseError::MissingProperties)
        ));

        let both = r#"<Mod id="x">
  <Properties><Name>Real Name</Name></Properties>
  <ActionGroups><ActionGroup>
    <Properties><LoadOrder>1</LoadOrder><Name>Group Name</Name></Properties>
    <Actions><UIScripts><Item>ui/a.js</Item></UIScripts></Actions>
  </ActionGroup></ActionGroups>
</Mod>"#;
        let descriptor = parse_modinfo_str(both, Path::new("x")).unwrap();
        assert_eq!(descriptor.display_name, "Real Name");
    }

    #[test]
    fn name_only_modinfo_has_no_effect() {
        let xml = r#"<Mod id="empty"><Properties><Name>Empty</Name></Properties></Mod>"#;
        assert!(matches!(
            parse_modinfo_str(xml, Path::new("Empty")),
            Err(ParseError::NoEffect)
        ));
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let xml = r#"<Mod id="x"><Properties><Name>x</Properties></Mod>"#;
        assert!(matches!(
            parse_modinfo_str(xml, Path::new("x")),
            Err(ParseError::Xml(_))
        ));
    }

    #[test]
    fn localized_name_resolves_from_module_text() {
        let dir = TempDir::new().unwrap();
        let mod_root = dir.path().join("LocMod");
        fs::create_dir_all(mod_root.join("text/en_us")).unwrap();
        fs::write(
            mod_root.join("text/en_us/ModuleText.xml"),
            r#"<Database>
  <EnglishText>
    <Row Tag="LOC_OTHER"><Text>Other</Text></Row>
    <Row Tag="LOC_MOD_NAME"><Text>Localized Mod</Text></Row>
  </EnglishText>
</Database>"#,
        )
        .unwrap();
        let modinfo = mod_root.join("LocMod.modinfo");
        fs::write(
            &modinfo,
            r#"<Mod id="loc-mod"><Properties><Name>LOC_MOD_NAME</Name></Properties>
<ActionGroup><Actions><UIScripts><Item>ui/a.js</Item></UIScripts></Actions></ActionGroup></Mod>"#,
        )
        .unwrap();

        let descriptor = parse_modinfo(&modinfo).unwrap();
        assert_eq!(descriptor.display_name, "Localized Mod");
    }

    #[test]
    fn localized_name_uses_declared_file() {
        let dir = TempDir::new().unwrap();
        let mod_root = dir.path().join("Declared");
        fs::create_dir_all(mod_root.join("text/en_us")).unwrap();
        fs::write(
            mod_root.join("text/en_us/Names.xml"),
            r#"<Database><EnglishText><Row Tag="LOC_DECLARED" Text="From Attribute"/></EnglishText></Database>"#,
        )
        .unwrap();
        let xml = r#"<Mod id="declared"><Properties><Name>LOC_DECLARED</Name></Properties>
<LocalizedText><File>text/en_us/Names.xml</File></LocalizedText>
<ActionGroup><Actions><UIScripts><Item>ui/a.js</Item></UIScripts></Actions></ActionGroup></Mod>"#;
        let descriptor = parse_modinfo_str(xml, &mod_root).unwrap();
        assert_eq!(descriptor.display_name, "From Attribute");
    }

    #[test]
    fn unresolved_localized_name_falls_back_to_folder() {
        let dir = TempDir::new().unwrap();
        let mod_root = dir.path().join("FallbackFolder");
        fs::create_dir_all(&mod_root).unwrap();
        let xml = r#"<Mod id="fallback"><Properties><Name>LOC_MISSING</Name></Properties>
<ActionGroup><Actions><UIScripts><Item>ui/a.js</Item></UIScripts></Actions></ActionGroup></Mod>"#;
        let descriptor = parse_modinfo_str(xml, &mod_root).unwrap();
        assert_eq!(descriptor.display_name, "FallbackFolder");
    }

    #[test]
    fn empty_localized_text_is_unresolved() {
        let dir = TempDir::new().unwrap();
        let mod_root = dir.path().join("BlankText");
        fs::create_dir_all(mod_root.join("text/en_us")).unwrap();
        fs::write(
            mod_root.join("text/en_us/ModuleText.xml"),
            r#"<Database><EnglishText><Row Tag="LOC_BLANK"><Text/></Row><Row Tag="LOC_SPACES"><Text>  </Text></Row></EnglishText></Database>"#,
        )
        .unwrap();
        let xml = |tag: &str| {
            format!(
                r#"<Mod id="blank"><Properties><Name>{tag}</Name></Properties>
<ActionGroup><Actions><UIScripts><Item>ui/a.js</Item></UIScripts></Actions></ActionGroup></Mod>"#
            )
        };

        let text_file = mod_root.join("text/en_us/ModuleText.xml");
        assert_eq!(lookup_localized_text(&text_file, "LOC_BLANK"), None);
        assert_eq!(lookup_localized_text(&text_file, "LOC_SPACES"), None);
        let descriptor = parse_modinfo_str(&xml("LOC_BLANK"), &mod_root).unwrap();
        assert_eq!(descriptor.display_name, "BlankText");
        let descriptor = parse_modinfo_str(&xml("LOC_SPACES"), &mod_root).unwrap();
        assert_eq!(descriptor.display_name, "BlankText");
    }

    #[test]
    fn explicit_folder_name_overrides_directory() {
        let dir = TempDir::new().unwrap();
        let mod_root = dir.path().join("renamed_id");
        fs::create_dir_all(&mod_root).unwrap();
        let modinfo = mod_root.join("Packed.modinfo");
        fs::write(
            &modinfo,
            r#"<Mod id=" renamed_id "><Properties><Name>LOC_MISSING</Name></Properties>
<ActionGroup><Actions><ImportFiles><Item>a.png</Item></ImportFiles></Actions></ActionGroup></Mod>"#,
        )
        .unwrap();

        assert_eq!(read_mod_id(&modinfo).as_deref(), Some("renamed_id"));
        let descriptor = parse_modinfo_named(&modinfo, "Packed Folder").unwrap();
        assert_eq!(descriptor.display_name, "Packed Folder");
        assert_eq!(descriptor.mod_id, "renamed_id");
        assert_eq!(parse_modinfo(&modinfo).unwrap().display_name, "renamed_id");
        assert_eq!(read_mod_id(&dir.path().join("missing.modinfo")), None);
    }

    #[test]
    fn items_outside_action_groups_are_ignored() {
        let xml = r#"<Mod id="stray"><Properties><Name>Stray</Name></Properties>
<UIScripts><Item>ui/stray.js</Item></UIScripts></Mod>"#;
        assert!(matches!(
            parse_modinfo_str(xml, Path::new("Stray")),
            Err(ParseError::NoEffect)
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = parse_modinfo(&dir.path().join("nope.modinfo"));
        assert!(matches!(result, Err(ParseError::Io { .. })));
    }
}
