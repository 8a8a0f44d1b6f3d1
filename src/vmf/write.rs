use std::io::Write;
use std::path::Path;

use super::{Block, Document, Entity, VersionInfo, Visgroup, World};

/// Streams VMF text into a writer, one top level section at a time
pub struct VMFBuilder<T: Write>(pub T);

impl<T: Write> VMFBuilder<T> {
    pub fn flush(mut self) -> std::io::Result<Self> {
        self.0.flush()?;
        Ok(self)
    }

    pub fn block(mut self, block: &Block) -> std::io::Result<Self> {
        write_block(&mut self.0, block, 0)?;
        Ok(self)
    }

    pub fn blocks<'a, I: IntoIterator<Item=&'a Block>>(mut self, blocks: I) -> std::io::Result<Self> {
        for block in blocks {
            self = self.block(block)?;
        }
        Ok(self)
    }

    pub fn version_info(self, version_info: &VersionInfo) -> std::io::Result<Self> {
        self.block(&version_info.to_block())
    }

    pub fn visgroups(self, visgroups: &[Visgroup]) -> std::io::Result<Self> {
        let mut block = Block::new("visgroups");
        block.blocks.extend(visgroups.iter().map(Visgroup::to_block));
        self.block(&block)
    }

    pub fn world(self, world: &World) -> std::io::Result<Self> {
        self.block(&world.to_block())
    }

    pub fn entities<'a, I: IntoIterator<Item=&'a Entity>>(mut self, entities: I) -> std::io::Result<Self> {
        for entity in entities {
            self = self.block(&entity.to_saved_block())?;
        }
        Ok(self)
    }

    /// Writes a whole document in Hammer's section order
    pub fn document(self, document: &Document) -> std::io::Result<Self> {
        let (view_settings, rest): (Vec<&Block>, Vec<&Block>) = document.blocks.iter()
            .partition(|block| block.name.eq_ignore_ascii_case("viewsettings"));
        self.version_info(&document.version_info)?
            .visgroups(&document.visgroups)?
            .blocks(view_settings)?
            .world(&document.world)?
            .entities(&document.entities)?
            .blocks(rest)
    }
}

fn write_block<W: Write>(out: &mut W, block: &Block, depth: usize) -> std::io::Result<()> {
    let indent = "\t".repeat(depth);
    write!(out, "{}{}\n{}{{\n", indent, block.name, indent)?;
    for (key, value) in &block.pairs {
        write!(out, "{}\t\"{}\" \"{}\"\n", indent, key, value)?;
    }
    for child in &block.blocks {
        write_block(out, child, depth + 1)?;
    }
    write!(out, "{}}}\n", indent)
}

/// Renders a document to VMF text
pub fn render_vmf(document: &Document) -> std::io::Result<Vec<u8>> {
    let VMFBuilder(buffer) = VMFBuilder(Vec::new()).document(document)?;
    Ok(buffer)
}

/// Writes a document to `path`; The file is written beside the target first and then moved over it,
/// so an existing file is never left half written
pub fn export_vmf<P: AsRef<Path>>(document: &Document, path: P) -> std::io::Result<()> {
    let path = path.as_ref();
    let content = render_vmf(document)?;

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    let result = std::fs::File::create(&temp_path)
        .and_then(|file| {
            let mut out = std::io::BufWriter::new(file);
            out.write_all(&content)?;
            out.flush()
        })
        .and_then(|_| std::fs::rename(&temp_path, path));
    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result
}
