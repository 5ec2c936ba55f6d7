//! GPU to CPU copies of render attachments.
//!
//! Texture-to-buffer copies pad every row to `COPY_BYTES_PER_ROW_ALIGNMENT`.
//! Stripping that padding and fixing the row order both happen in `unpad_rows`,
//! so no other code needs to know the GPU's storage layout.

use crate::device::BackendError;

/// Order in which a backend stores image rows.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RowOrder {
    /// Row 0 is the top of the image (image-file convention).
    TopDown,
    /// Row 0 is the bottom of the image.
    BottomUp,
}

/// wgpu texture copies are top row first on every backend.
pub const NATIVE_ROW_ORDER: RowOrder = RowOrder::TopDown;

/// Bytes per row of a texture copy, rounded up to the copy alignment.
pub fn padded_bytes_per_row(width: u32, bytes_per_pixel: u32) -> u32 {
    let unpadded = width * bytes_per_pixel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Copies `height` rows of `row_bytes` out of a padded buffer.
///
/// The result is always top-down: rows stored `BottomUp` are flipped.
pub fn unpad_rows(padded: &[u8], row_bytes: usize, padded_row_bytes: usize, height: usize, order: RowOrder) -> Vec<u8> {
    let mut out = Vec::with_capacity(row_bytes * height);
    for y in 0..height {
        let src_row = match order {
            RowOrder::TopDown => y,
            RowOrder::BottomUp => height - 1 - y,
        };
        let start = src_row * padded_row_bytes;
        out.extend_from_slice(&padded[start..start + row_bytes]);
    }
    out
}

/// Where one `map_async` request stands once the device has been polled.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MapOutcome {
    Mapped,
    /// Callback has not run; unmapping cancels the request.
    Pending,
    Failed(String),
}

/// Maps every buffer for reading and blocks until all are mapped.
///
/// On failure no buffer is left mapped or waiting, so the staging buffers can
/// be copied into again.
pub(crate) fn map_read_blocking(device: &wgpu::Device, buffers: &[&wgpu::Buffer]) -> Result<(), BackendError> {
    let mut receivers = Vec::with_capacity(buffers.len());
    for buffer in buffers {
        let (sender, receiver) = futures::channel::oneshot::channel();
        buffer.slice(..).map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        receivers.push(receiver);
    }

    let poll = device
        .poll(wgpu::PollType::wait_indefinitely())
        .map(|_| ())
        .map_err(|e| format!("device poll failed: {e}"));

    let outcomes: Vec<MapOutcome> = receivers
        .iter_mut()
        .map(|receiver| match receiver.try_recv() {
            Ok(Some(Ok(()))) => MapOutcome::Mapped,
            Ok(Some(Err(e))) => MapOutcome::Failed(format!("buffer map failed: {e}")),
            Ok(None) => MapOutcome::Pending,
            Err(_) => MapOutcome::Failed("map callback dropped".to_owned()),
        })
        .collect();

    settle(poll, &outcomes).map_err(|(err, to_unmap)| {
        for i in to_unmap {
            buffers[i].unmap();
        }
        err
    })
}

/// Decides whether a batch of map requests succeeded.
///
/// On failure, returns the error to report and the indices of the buffers that
/// are mapped or still waiting. Unmapping a buffer whose map failed is itself a
/// validation error, so those are left out.
fn settle(poll: Result<(), String>, outcomes: &[MapOutcome]) -> Result<(), (BackendError, Vec<usize>)> {
    let failure = poll.err().or_else(|| {
        outcomes.iter().find_map(|o| match o {
            MapOutcome::Mapped => None,
            MapOutcome::Pending => Some("buffer map did not complete".to_owned()),
            MapOutcome::Failed(msg) => Some(msg.clone()),
        })
    });
    match failure {
        None => Ok(()),
        Some(msg) => {
            let to_unmap = outcomes
                .iter()
                .enumerate()
                .filter(|(_, o)| !matches!(o, MapOutcome::Failed(_)))
                .map(|(i, _)| i)
                .collect();
            Err((BackendError::Readback(msg), to_unmap))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(64, 4), 256);
        assert_eq!(padded_bytes_per_row(65, 4), 512);
        assert_eq!(padded_bytes_per_row(3, 1), 256);
        assert_eq!(padded_bytes_per_row(640, 4), 2560);
        assert_eq!(padded_bytes_per_row(640, 1), 768);
    }

    fn padded_image() -> Vec<u8> {
        // 3 rows of 2 payload bytes, padded to 4: [r, r, pad, pad]
        vec![
            0, 1, 0xEE, 0xEE, //
            10, 11, 0xEE, 0xEE, //
            20, 21, 0xEE, 0xEE,
        ]
    }

    #[test]
    fn top_down_keeps_order_and_drops_padding() {
        let out = unpad_rows(&padded_image(), 2, 4, 3, RowOrder::TopDown);
        assert_eq!(out, vec![0, 1, 10, 11, 20, 21]);
    }

    #[test]
    fn bottom_up_is_flipped() {
        let out = unpad_rows(&padded_image(), 2, 4, 3, RowOrder::BottomUp);
        assert_eq!(out, vec![20, 21, 10, 11, 0, 1]);
    }

    #[test]
    fn unpadded_input_passes_through() {
        let data: Vec<u8> = (0..12).collect();
        assert_eq!(unpad_rows(&data, 4, 4, 3, RowOrder::TopDown), data);
    }

    #[test]
    fn all_mapped_settles() {
        assert_eq!(settle(Ok(()), &[MapOutcome::Mapped, MapOutcome::Mapped, MapOutcome::Mapped]), Ok(()));
    }

    #[test]
    fn failed_map_unmaps_the_others() {
        let outcomes = [MapOutcome::Mapped, MapOutcome::Failed("buffer map failed: lost".to_owned()), MapOutcome::Mapped];
        let (err, to_unmap) = settle(Ok(()), &outcomes).unwrap_err();
        assert_eq!(err, BackendError::Readback("buffer map failed: lost".to_owned()));
        assert_eq!(to_unmap, vec![0, 2]);
    }

    #[test]
    fn poll_failure_cancels_pending_maps() {
        let outcomes = [MapOutcome::Mapped, MapOutcome::Pending, MapOutcome::Failed("dropped".to_owned())];
        let (err, to_unmap) = settle(Err("device poll failed: lost".to_owned()), &outcomes).unwrap_err();
        assert_eq!(err, BackendError::Readback("device poll failed: lost".to_owned()));
        assert_eq!(to_unmap, vec![0, 1]);
    }

    #[test]
    fn pending_after_successful_poll_is_an_error() {
        let (err, to_unmap) = settle(Ok(()), &[MapOutcome::Pending]).unwrap_err();
        assert!(matches!(err, BackendError::Readback(msg) if msg.contains("did not complete")));
        assert_eq!(to_unmap, vec![0]);
    }

    #[test]
    fn zero_height_is_empty() {
        assert!(unpad_rows(&[], 4, 256, 0, RowOrder::BottomUp).is_empty());
    }
}
