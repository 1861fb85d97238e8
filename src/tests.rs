//! Archive fixtures shared by the unit tests.

use crate::types::TarCompression;
use std::fs;
use std::io::Write;
use std::path::Path;

pub struct FixtureEntry {
    pub name: String,
    pub data: Vec<u8>,
    pub mode: u32,
    pub is_dir: bool,
}

impl FixtureEntry {
    pub fn file(name: &str, data: &[u8], mode: u32) -> Self {
        Self {
            name: name.to_string(),
            data: data.to_vec(),
            mode,
            is_dir: false,
        }
    }

    pub fn dir(name: &str) -> Self {
        Self {
            name: name.to_string(),
            data: Vec::new(),
            mode: 0o755,
            is_dir: true,
        }
    }
}

pub fn write_zip(path: &Path, entries: &[FixtureEntry]) {
    let file = fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);

    for entry in entries {
        let options = zip::write::FileOptions::default().unix_permissions(entry.mode);
        if entry.is_dir {
            zip.add_directory(entry.name.trim_end_matches('/'), options)
                .unwrap();
        } else {
            zip.start_file(entry.name.as_str(), options).unwrap();
            zip.write_all(&entry.data).unwrap();
        }
    }

    zip.finish().unwrap();
}

pub fn write_tar(path: &Path, compression: TarCompression, entries: &[FixtureEntry]) {
    let file = fs::File::create(path).unwrap();
    let writer: Box<dyn Write> = match compression {
        TarCompression::Bzip2 => Box::new(bzip2::write::BzEncoder::new(
            file,
            bzip2::Compression::default(),
        )),
        TarCompression::Gzip => Box::new(flate2::write::GzEncoder::new(
            file,
            flate2::Compression::default(),
        )),
        TarCompression::Xz => Box::new(xz2::write::XzEncoder::new(file, 6)),
        TarCompression::None => Box::new(file),
    };

    let mut builder = tar::Builder::new(writer);
    for entry in entries {
        let mut header = tar::Header::new_gnu();
        header.set_mode(entry.mode);
        if entry.is_dir {
            header.set_entry_type(tar::EntryType::Directory);
            header.set_size(0);
            builder
                .append_data(&mut header, &entry.name, std::io::empty())
                .unwrap();
        } else {
            header.set_size(entry.data.len() as u64);
            builder
                .append_data(&mut header, &entry.name, entry.data.as_slice())
                .unwrap();
        }
    }

    // Dropping the boxed encoder writes its trailer.
    let mut writer = builder.into_inner().unwrap();
    writer.flush().unwrap();
}

/// A stand-in for Blender's python: records its arguments and exits with `code`.
#[cfg(unix)]
pub fn fake_python_script(log: &Path, code: i32) -> Vec<u8> {
    format!(
        "#!/bin/sh\necho \"$@\" >> \"{}\"\nexit {}\n",
        log.display(),
        code
    )
    .into_bytes()
}

#[test]
fn test_fixture_zip_lists_entries_in_order() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("fixture.zip");
    write_zip(
        &path,
        &[
            FixtureEntry::dir("foo/"),
            FixtureEntry::file("foo/a.txt", b"a", 0o644),
        ],
    );

    let mut archive = zip::ZipArchive::new(fs::File::open(&path).unwrap()).unwrap();
    assert_eq!(archive.by_index(0).unwrap().name(), "foo/");
    assert_eq!(archive.by_index(1).unwrap().name(), "foo/a.txt");
}
