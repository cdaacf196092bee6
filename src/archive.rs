use crate::error::{ArchiveError, UnrarError};
use crate::metadata::{self, MODINFO_EXTENSION};
use blake3::Hasher;
use filetime::{set_file_mtime, FileTime};
use std::{
    fs, io,
    path::{Component, Path, PathBuf, MAIN_SEPARATOR_STR},
    process::{Command, Stdio},
    sync::atomic::{AtomicUsize, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};
use time::{Date, Month, PrimitiveDateTime, Time as TimeOfDay};
use walkdir::WalkDir;

pub const DEFAULT_UNRAR: &str = "unrar";
const SCRATCH_PREFIX: &str = "_scratch-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    SevenZip,
    Rar,
}

impl ArchiveFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "zip" => Some(ArchiveFormat::Zip),
            "7z" => Some(ArchiveFormat::SevenZip),
            "rar" | "r00" => Some(ArchiveFormat::Rar),
            _ => None,
        }
    }
}

pub fn is_supported_archive(path: &Path) -> bool {
    path.is_file() && ArchiveFormat::from_path(path).is_some()
}

/// A normalized mod directory: `root` directly contains `metadata_file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMod {
    pub root: PathBuf,
    pub metadata_file: PathBuf,
    /// Name of the mod root as packed in the archive, before the rename.
    pub folder_name: String,
}

#[derive(Debug, Clone)]
pub struct Extractor {
    unrar_path: PathBuf,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(DEFAULT_UNRAR)
    }
}

impl Extractor {
    pub fn new(unrar_path: impl Into<PathBuf>) -> Self {
        Self {
            unrar_path: unrar_path.into(),
        }
    }

    /// Unpacks `archive` under `target_root` and leaves exactly one mod
    /// directory there, named after the mod id. An existing directory of that
    /// name is replaced. Nothing is left behind on failure.
    pub fn extract(&self, archive: &Path, target_root: &Path) -> Result<ExtractedMod, ArchiveError> {
        let format = ArchiveFormat::from_path(archive).ok_or_else(|| {
            let ext = archive
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_else(|| display_name(archive));
            ArchiveError::UnsupportedFormat(ext)
        })?;
        if !archive.is_file() {
            return Err(ArchiveError::ArchiveNotFound(archive.to_path_buf()));
        }
        fs::create_dir_all(target_root)
            .map_err(|err| ArchiveError::fs("create target root", target_root, err))?;

        let scratch = make_scratch_dir(target_root, archive)?;
        let mut guard = ScratchGuard::new(scratch.clone());

        match format {
            ArchiveFormat::Zip => extract_zip(archive, &scratch)?,
            ArchiveFormat::SevenZip => extract_7z(archive, &scratch)?,
            ArchiveFormat::Rar => self.extract_rar(archive, &scratch)?,
        }

        let metadata_file = find_modinfo(&scratch).ok_or(ArchiveError::NoMetadataFound)?;
        let mod_root = metadata_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| scratch.clone());
        let metadata_name = metadata_file
            .file_name()
            .map(|name| name.to_os_string())
            .ok_or(ArchiveError::NoMetadataFound)?;

        let dest = target_root.join(install_dir_name(&metadata_file));
        let folder_name = if mod_root == scratch {
            dest.file_name()
        } else {
            mod_root.file_name()
        }
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
        if dest.exists() {
            fs::remove_dir_all(&dest)
                .map_err(|err| ArchiveError::fs("remove existing mod dir", &dest, err))?;
        }
        guard.track(dest.clone());

        if mod_root == scratch {
            move_dir(&scratch, &dest)?;
        } else {
            move_dir(&mod_root, &dest)?;
            fs::remove_dir_all(&scratch)
                .map_err(|err| ArchiveError::fs("remove scratch dir", &scratch, err))?;
        }
        guard.disarm();

        Ok(ExtractedMod {
            metadata_file: dest.join(metadata_name),
            root: dest,
            folder_name,
        })
    }

    fn extract_rar(&self, path: &Path, dest: &Path) -> Result<(), ArchiveError> {
        let mut dest_arg = dest.as_os_str().to_os_string();
        dest_arg.push(MAIN_SEPARATOR_STR);
        let output = Command::new(&self.unrar_path)
            .arg("x")
            .arg("-r")
            .arg("-y")
            .arg(path)
            .arg(dest_arg)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output();

        let output = match output {
            Ok(output) => output,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ArchiveError::ToolMissing(self.unrar_path.clone()));
            }
            Err(err) => return Err(ArchiveError::fs("launch unrar", &self.unrar_path, err)),
        };

        match output.status.code() {
            Some(0) | Some(1) => Ok(()),
            Some(code) => {
                log::debug!(
                    "unrar exited with {code}: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                Err(UnrarError::from_exit_code(code)
                    .map(ArchiveError::Unrar)
                    .unwrap_or(ArchiveError::ArchiveToolFailure(code)))
            }
            None => Err(ArchiveError::ArchiveToolFailure(-1)),
        }
    }
}

/// Removes the scratch dir and any partially moved destination unless
/// disarmed.
struct ScratchGuard {
    paths: Vec<PathBuf>,
    armed: bool,
}

impl ScratchGuard {
    fn new(path: PathBuf) -> Self {
        Self {
            paths: vec![path],
            armed: true,
        }
    }

    fn track(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        for path in &self.paths {
            if path.exists() {
                let _ = fs::remove_dir_all(path);
            }
        }
    }
}

fn extract_zip(path: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let file = fs::File::open(path).map_err(|err| ArchiveError::fs("open zip", path, err))?;
    let mut archive = zip::ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let Some(out_path) = file.enclosed_name() else {
            log::debug!("skipping unsafe zip entry {}", file.name());
            continue;
        };

        let out_path = dest.join(out_path);
        if file.is_dir() {
            fs::create_dir_all(&out_path)
                .map_err(|err| ArchiveError::fs("create zip dir", &out_path, err))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| ArchiveError::fs("create zip dir", parent, err))?;
        }

        let mut out_file = fs::File::create(&out_path)
            .map_err(|err| ArchiveError::fs("write zip entry", &out_path, err))?;
        io::copy(&mut file, &mut out_file)
            .map_err(|err| ArchiveError::fs("extract zip entry", &out_path, err))?;
        if let Some(dt) = file.last_modified() {
            if let Some(mtime) = zip_time_to_unix(dt) {
                let _ = set_file_mtime(&out_path, FileTime::from_unix_time(mtime, 0));
            }
        }
    }

    Ok(())
}

fn zip_time_to_unix(dt: zip::DateTime) -> Option<i64> {
    let month = Month::try_from(dt.month()).ok()?;
    let date = Date::from_calendar_date(dt.year() as i32, month, dt.day()).ok()?;
    let time = TimeOfDay::from_hms(dt.hour(), dt.minute(), dt.second()).ok()?;
    Some(PrimitiveDateTime::new(date, time).assume_utc().unix_timestamp())
}

fn extract_7z(path: &Path, dest: &Path) -> Result<(), ArchiveError> {
    sevenz_rust::decompress_file_with_extract_fn(path, dest, |entry, reader, out_path| {
        if !is_enclosed_entry(entry.name()) {
            log::debug!("skipping unsafe 7z entry {}", entry.name());
            // Solid blocks share one stream; the skipped bytes must still be read.
            io::copy(reader, &mut io::sink()).map_err(sevenz_rust::Error::io)?;
            return Ok(true);
        }
        sevenz_rust::default_entry_extract_fn(entry, reader, out_path)
    })
    .map_err(|err| ArchiveError::SevenZip(err.to_string()))
}

/// True when an archive entry name stays inside the extraction root.
fn is_enclosed_entry(name: &str) -> bool {
    let normalized = name.replace('\\', "/");
    let path = Path::new(&normalized);
    !normalized.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// First `.modinfo` in a depth-first walk with entries sorted by name.
pub fn find_modinfo(root: &Path) -> Option<PathBuf> {
    let mut found = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_ignored_path(entry.path()))
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_modinfo(path));

    let first = found.next()?;
    let extra = found.count();
    if extra > 0 {
        log::debug!(
            "{} additional .modinfo file(s) under {}, using {}",
            extra,
            root.display(),
            first.display()
        );
    }
    Some(first)
}

fn is_modinfo(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(MODINFO_EXTENSION))
        .unwrap_or(false)
}

fn is_ignored_path(path: &Path) -> bool {
    path.components().any(|component| {
        let part = component.as_os_str().to_string_lossy();
        part.eq_ignore_ascii_case("__MACOSX")
            || part.eq_ignore_ascii_case(".ds_store")
            || part.eq_ignore_ascii_case("thumbs.db")
            || part == ".git"
            || part == ".svn"
    })
}

/// Mod id when readable, metadata file stem otherwise. Unreadable ids fail
/// later in parsing.
fn install_dir_name(metadata_file: &Path) -> String {
    let id = metadata::read_mod_id(metadata_file).unwrap_or_else(|| {
        metadata_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    mod_dir_name(&id)
}

/// Directory name a mod id is installed under. Never empty.
pub fn mod_dir_name(mod_id: &str) -> String {
    let name = sanitize_dir_name(mod_id);
    if name.is_empty() {
        "mod".to_string()
    } else {
        name
    }
}

/// Keeps a name usable as a single path component on every platform.
pub fn sanitize_dir_name(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || matches!(ch, '-' | '_' | '.' | ' ') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_matches(|ch| ch == '.' || ch == ' ').to_string()
}

static SCRATCH_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_scratch_dir(target_root: &Path, archive: &Path) -> Result<PathBuf, ArchiveError> {
    let counter = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut hasher = Hasher::new();
    hasher.update(archive.to_string_lossy().as_bytes());
    hasher.update(&nanos.to_le_bytes());
    hasher.update(&counter.to_le_bytes());
    hasher.update(&std::process::id().to_le_bytes());
    let hash = hasher.finalize().to_hex().to_string();

    let scratch = target_root.join(format!("{SCRATCH_PREFIX}{}", &hash[..16]));
    match fs::create_dir(&scratch) {
        Ok(()) => Ok(scratch),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            Err(ArchiveError::ScratchCollision(scratch))
        }
        Err(err) => Err(ArchiveError::fs("create scratch dir", &scratch, err)),
    }
}

/// Renames `source` to `dest`, copying when a rename is not possible.
pub(crate) fn move_dir(source: &Path, dest: &Path) -> Result<(), ArchiveError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|err| ArchiveError::fs("create target parent", parent, err))?;
    }
    if fs::rename(source, dest).is_ok() {
        return Ok(());
    }
    copy_dir(source, dest)?;
    fs::remove_dir_all(source).map_err(|err| ArchiveError::fs("remove moved dir", source, err))
}

pub(crate) fn copy_dir(source: &Path, dest: &Path) -> Result<(), ArchiveError> {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(source).to_path_buf();
            ArchiveError::fs("walk dir", path, io::Error::from(err))
        })?;
        let rel = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|err| ArchiveError::fs("create dir", &target, err))?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|err| ArchiveError::fs("create file dir", parent, err))?;
            }
            fs::copy(entry.path(), &target)
                .map_err(|err| ArchiveError::fs("copy file", &target, err))?;
        }
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    pub(crate) fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (name, contents) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(contents.as_bytes()).unwrap();
            }
        }
        writer.finish().unwrap();
    }

    fn leftovers(root: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(root)
            .unwrap()
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn root_level_modinfo_renames_scratch_dir() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("whatever-name-v3.zip");
        write_zip(
            &archive,
            &[("Foo.modinfo", "<Mod id=\"foo\"/>"), ("ui/script.js", "//")],
        );
        let target = dir.path().join("target");

        let extracted = Extractor::default().extract(&archive, &target).unwrap();
        assert_eq!(extracted.root, target.join("foo"));
        assert_eq!(extracted.metadata_file, target.join("foo/Foo.modinfo"));
        assert_eq!(extracted.folder_name, "foo");
        assert!(target.join("foo/ui/script.js").is_file());
        assert_eq!(leftovers(&target), vec!["foo"]);
    }

    #[test]
    fn nested_mod_root_discards_siblings() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("bundle.zip");
        write_zip(
            &archive,
            &[
                ("README.txt", "read me"),
                ("Foo/", ""),
                ("Foo/Foo.modinfo", "<Mod id=\"foo\"/>"),
                ("Foo/ui/script.js", "//"),
                ("Extras/notes.txt", "junk"),
            ],
        );
        let target = dir.path().join("target");

        let extracted = Extractor::default().extract(&archive, &target).unwrap();
        assert_eq!(extracted.root, target.join("foo"));
        assert_eq!(extracted.folder_name, "Foo");
        assert!(extracted.root.join("ui/script.js").is_file());
        assert!(!extracted.root.join("README.txt").exists());
        assert!(!extracted.root.join("Extras").exists());
        assert_eq!(leftovers(&target), vec!["foo"]);
    }

    #[test]
    fn first_modinfo_in_sorted_order_wins() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("two.zip");
        write_zip(
            &archive,
            &[
                ("Zeta/Zeta.modinfo", "<Mod id=\"z\"/>"),
                ("Alpha/Alpha.modinfo", "<Mod id=\"a\"/>"),
            ],
        );
        let target = dir.path().join("target");

        let extracted = Extractor::default().extract(&archive, &target).unwrap();
        assert_eq!(extracted.root, target.join("a"));
        assert_eq!(extracted.folder_name, "Alpha");
        assert_eq!(leftovers(&target), vec!["a"]);
    }

    #[test]
    fn macos_resource_forks_are_not_metadata() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("mac.zip");
        write_zip(
            &archive,
            &[
                ("__MACOSX/Foo/._Foo.modinfo", "binary"),
                ("Foo/Foo.modinfo", "<Mod id=\"foo\"/>"),
            ],
        );
        let target = dir.path().join("target");

        let extracted = Extractor::default().extract(&archive, &target).unwrap();
        assert_eq!(extracted.root, target.join("foo"));
    }

    #[test]
    fn existing_destination_is_replaced() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target");
        fs::create_dir_all(target.join("foo")).unwrap();
        fs::write(target.join("foo/stale.txt"), "old").unwrap();

        let archive = dir.path().join("foo.zip");
        write_zip(&archive, &[("Foo/Foo.modinfo", "<Mod id=\"foo\"/>")]);

        Extractor::default().extract(&archive, &target).unwrap();
        assert!(target.join("foo/Foo.modinfo").is_file());
        assert!(!target.join("foo/stale.txt").exists());
    }

    #[test]
    fn archive_without_modinfo_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("junk.zip");
        write_zip(&archive, &[("readme.txt", "hi"), ("data/a.xml", "<a/>")]);
        let target = dir.path().join("target");

        let result = Extractor::default().extract(&archive, &target);
        assert!(matches!(result, Err(ArchiveError::NoMetadataFound)));
        assert!(leftovers(&target).is_empty());
    }

    #[test]
    fn corrupt_zip_is_rejected_and_cleaned() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("broken.zip");
        fs::write(&archive, b"not a zip at all").unwrap();
        let target = dir.path().join("target");

        let result = Extractor::default().extract(&archive, &target);
        assert!(matches!(result, Err(ArchiveError::Zip(_))));
        assert!(leftovers(&target).is_empty());
    }

    #[test]
    fn unknown_extension_fails_before_touching_disk() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("mod.tar.gz");
        fs::write(&archive, b"data").unwrap();
        let target = dir.path().join("target");

        let result = Extractor::default().extract(&archive, &target);
        assert!(matches!(result, Err(ArchiveError::UnsupportedFormat(ext)) if ext == ".gz"));
        assert!(!target.exists());
    }

    #[test]
    fn missing_archive_is_reported() {
        let dir = TempDir::new().unwrap();
        let result = Extractor::default().extract(&dir.path().join("gone.7z"), dir.path());
        assert!(matches!(result, Err(ArchiveError::ArchiveNotFound(_))));
    }

    #[test]
    fn format_detection_is_case_insensitive() {
        assert_eq!(
            ArchiveFormat::from_path(Path::new("a.ZIP")),
            Some(ArchiveFormat::Zip)
        );
        assert_eq!(
            ArchiveFormat::from_path(Path::new("a.7z")),
            Some(ArchiveFormat::SevenZip)
        );
        assert_eq!(
            ArchiveFormat::from_path(Path::new("a.r00")),
            Some(ArchiveFormat::Rar)
        );
        assert_eq!(ArchiveFormat::from_path(Path::new("a.pak")), None);
        assert_eq!(ArchiveFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn sevenz_archives_extract() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source");
        fs::create_dir_all(source.join("Foo/ui")).unwrap();
        fs::write(source.join("Foo/Foo.modinfo"), "<Mod id=\"foo\"/>").unwrap();
        fs::write(source.join("Foo/ui/script.js"), "//").unwrap();
        let archive = dir.path().join("foo.7z");
        sevenz_rust::compress_to_path(&source, &archive).unwrap();
        let target = dir.path().join("target");

        let extracted = Extractor::default().extract(&archive, &target).unwrap();
        assert_eq!(extracted.root, target.join("foo"));
        assert!(extracted.root.join("ui/script.js").is_file());
        assert_eq!(leftovers(&target), vec!["foo"]);
    }

    #[test]
    fn sevenz_entries_escaping_the_root_are_skipped() {
        use sevenz_rust::{SevenZArchiveEntry, SevenZWriter};

        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("escape.7z");
        let mut writer = SevenZWriter::create(&archive).unwrap();
        for (name, contents) in [
            ("../../escaped.txt", "outside"),
            ("M/M.modinfo", "<Mod id=\"m\"/>"),
            ("M/ui/a.js", "//"),
        ] {
            let mut entry = SevenZArchiveEntry::new();
            entry.name = name.to_string();
            writer
                .push_archive_entry(entry, Some(contents.as_bytes()))
                .unwrap();
        }
        writer.finish().unwrap();
        let target = dir.path().join("a/b/target");

        let extracted = Extractor::default().extract(&archive, &target).unwrap();
        assert_eq!(extracted.root, target.join("m"));
        assert_eq!(
            fs::read_to_string(extracted.root.join("ui/a.js")).unwrap(),
            "//"
        );
        assert!(!dir.path().join("a/escaped.txt").exists());
        assert!(!dir.path().join("escaped.txt").exists());
        assert!(!target.join("escaped.txt").exists());
        assert_eq!(leftovers(&target), vec!["m"]);
    }

    #[test]
    fn entry_names_must_stay_enclosed() {
        assert!(is_enclosed_entry("Foo/Foo.modinfo"));
        assert!(is_enclosed_entry("./ui/a.js"));
        assert!(!is_enclosed_entry("../x"));
        assert!(!is_enclosed_entry("Foo/../../x"));
        assert!(!is_enclosed_entry("/etc/passwd"));
        assert!(!is_enclosed_entry("..\\x"));
        assert!(!is_enclosed_entry(""));
    }

    #[test]
    fn mod_dir_name_is_never_empty() {
        assert_eq!(mod_dir_name("foo_mod"), "foo_mod");
        assert_eq!(mod_dir_name(".."), "mod");
    }

    #[test]
    fn sanitize_keeps_single_component() {
        assert_eq!(sanitize_dir_name("foo_mod"), "foo_mod");
        assert_eq!(sanitize_dir_name("../evil/name"), "_evil_name");
        assert_eq!(sanitize_dir_name("  spaced name.  "), "spaced name");
    }

    #[test]
    fn missing_unrar_is_reported() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("mod.rar");
        fs::write(&archive, b"Rar!").unwrap();
        let target = dir.path().join("target");

        let extractor = Extractor::new(dir.path().join("no-such-unrar"));
        let result = extractor.extract(&archive, &target);
        assert!(matches!(result, Err(ArchiveError::ToolMissing(_))));
        assert!(leftovers(&target).is_empty());
    }

    #[cfg(unix)]
    fn stub_unrar(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn unrar_warning_code_is_ignored() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("mod.r00");
        fs::write(&archive, b"Rar!").unwrap();
        let stub = stub_unrar(
            dir.path(),
            "unrar-warn.sh",
            "mkdir -p \"$5/Foo\"\nprintf '<Mod id=\"foo\"/>' > \"$5/Foo/Foo.modinfo\"\nexit 1",
        );
        let target = dir.path().join("target");

        let extracted = Extractor::new(stub).extract(&archive, &target).unwrap();
        assert_eq!(extracted.root, target.join("foo"));
    }

    #[cfg(unix)]
    #[test]
    fn unrar_failure_codes_are_mapped() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("mod.rar");
        fs::write(&archive, b"Rar!").unwrap();
        let target = dir.path().join("target");

        let stub = stub_unrar(dir.path(), "unrar-locked.sh", "exit 4");
        let result = Extractor::new(&stub).extract(&archive, &target);
        assert!(matches!(
            result,
            Err(ArchiveError::Unrar(UnrarError::LockedArchive))
        ));

        let stub = stub_unrar(dir.path(), "unrar-odd.sh", "exit 42");
        let result = Extractor::new(&stub).extract(&archive, &target);
        assert!(matches!(result, Err(ArchiveError::ArchiveToolFailure(42))));
        assert!(leftovers(&target).is_empty());
    }
}
