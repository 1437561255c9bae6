use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::buffer::Buffer;
use arrow::compute::concat_batches;
use arrow::ipc::convert::fb_to_schema;
use arrow::ipc::reader::{FileDecoder, read_footer_length};
use arrow::ipc::root_as_footer;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use log::debug;
use memmap2::Mmap;

use crate::core::{ColflowError, Result};

const TRAILER_SIZE: usize = 10;

/// Read an Arrow IPC file as one record batch.
///
/// The file is memory mapped; a file holding a single batch is returned
/// without copying, several batches are concatenated.
pub fn read_ipc_file<P: AsRef<Path>>(path: P) -> Result<RecordBatch> {
    let file = File::open(path.as_ref())?;
    // SAFETY: the mapping is read only and the file is not expected to change while read.
    let mmap = unsafe { Mmap::map(&file)? };
    let buffer = Buffer::from(Bytes::from_owner(mmap));

    if buffer.len() < TRAILER_SIZE {
        return Err(ColflowError::Source(format!(
            "{} is too short to be an Arrow IPC file",
            path.as_ref().display()
        )));
    }
    let trailer_start = buffer.len() - TRAILER_SIZE;
    let trailer: [u8; TRAILER_SIZE] = buffer[trailer_start..]
        .try_into()
        .map_err(|_| ColflowError::Source("truncated IPC trailer".to_string()))?;
    let footer_len = read_footer_length(trailer)?;
    let footer_start = trailer_start
        .checked_sub(footer_len)
        .ok_or_else(|| ColflowError::Source("IPC footer exceeds file".to_string()))?;
    let footer = root_as_footer(&buffer[footer_start..trailer_start])
        .map_err(|e| ColflowError::ArrowError(e.to_string()))?;

    let schema = Arc::new(fb_to_schema(footer.schema().ok_or_else(|| {
        ColflowError::Source("missing schema in IPC footer".to_string())
    })?));
    let mut decoder = FileDecoder::new(Arc::clone(&schema), footer.version());

    // dictionaries first, the decoder keeps them for the batches that follow
    for block in footer.dictionaries().iter().flatten() {
        let block_len = block.bodyLength() as usize + block.metaDataLength() as usize;
        let data = buffer.slice_with_length(block.offset() as usize, block_len);
        decoder.read_dictionary(block, &data)?;
    }

    let mut batches = Vec::new();
    for block in footer.recordBatches().iter().flatten() {
        let block_len = block.bodyLength() as usize + block.metaDataLength() as usize;
        let data = buffer.slice_with_length(block.offset() as usize, block_len);
        let batch = decoder
            .read_record_batch(block, &data)?
            .ok_or_else(|| ColflowError::Source("failed to decode record batch".to_string()))?;
        batches.push(batch);
    }
    debug!(
        "read {} batches from {}",
        batches.len(),
        path.as_ref().display()
    );

    match batches.len() {
        0 => Ok(RecordBatch::new_empty(schema)),
        1 => Ok(batches.swap_remove(0)),
        _ => Ok(concat_batches(&schema, &batches)?),
    }
}

/// Write `batches` to an Arrow IPC file at `path`.
pub fn write_ipc_file<P: AsRef<Path>>(path: P, batches: &[RecordBatch]) -> Result<()> {
    let first = batches
        .first()
        .ok_or_else(|| ColflowError::InvalidArgument("no batches to write".to_string()))?;
    let file = File::create(path.as_ref())?;
    let mut writer = FileWriter::try_new(file, &first.schema())?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.finish()?;
    Ok(())
}
