//! Per-request-type dispatch: read the fixed tail (and any trailing payload),
//! call into [`UsenetDownloader`]/[`Database`], and write a response.
//!
//! Handlers are deliberately short: lock nothing beyond what the called method
//! already locks internally, snapshot what's needed, and hand it straight to
//! the wire encoder. They never call out to article workers directly — every
//! mutation goes through the same `UsenetDownloader` methods the REST API uses.

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::db::Database;
use crate::downloader::queue_editor::{QueueEditAction, QueueEditRequest};
use crate::error::Result;
use crate::types::{DownloadId, Priority};
use crate::UsenetDownloader;

use super::protocol::{self, RequestType};

/// Fixed tail size, in bytes, expected for each request type (header excluded).
pub(crate) fn expected_request_size(request_type: RequestType) -> usize {
    protocol::HEADER_SIZE
        + match request_type {
            RequestType::Download => 20,
            RequestType::PauseUnpause => 4,
            RequestType::List => 4,
            RequestType::SetDownloadRate => 4,
            RequestType::DumpDebug => 0,
            RequestType::EditQueue => 28,
            RequestType::Log => 4,
            RequestType::Shutdown => 0,
            RequestType::Version => 0,
            RequestType::PostQueue => 0,
            RequestType::WriteLog => 12,
            RequestType::Scan => 0,
            RequestType::PauseUnpausePostProcessor => 4,
            RequestType::History => 12,
        }
}

/// Read the fixed tail for `request_type`, dispatch to its handler, and write
/// the response to `socket`.
pub(crate) async fn dispatch(
    request_type: RequestType,
    socket: &mut TcpStream,
    downloader: &Arc<UsenetDownloader>,
) -> Result<()> {
    let tail_len = expected_request_size(request_type) - protocol::HEADER_SIZE;
    let tail = protocol::read_trailing(socket, tail_len).await.map_err(std::io::Error::from)?;

    match request_type {
        RequestType::Download => handle_download(socket, downloader, &tail).await,
        RequestType::PauseUnpause => handle_pause_unpause(socket, downloader, &tail).await,
        RequestType::List => handle_list(socket, downloader).await,
        RequestType::SetDownloadRate => handle_set_download_rate(socket, downloader, &tail).await,
        RequestType::DumpDebug => handle_dump_debug(socket, downloader).await,
        RequestType::EditQueue => handle_edit_queue(socket, downloader, &tail).await,
        RequestType::Log => handle_log(socket, downloader, &tail).await,
        RequestType::Shutdown => handle_shutdown(socket).await,
        RequestType::Version => handle_version(socket).await,
        RequestType::PostQueue => handle_post_queue(socket, downloader).await,
        RequestType::WriteLog => handle_write_log(socket, &tail).await,
        RequestType::Scan => handle_scan(socket).await,
        RequestType::PauseUnpausePostProcessor => {
            handle_pause_unpause_post_processor(socket, downloader, &tail).await
        }
        RequestType::History => handle_history(socket, downloader, &tail).await,
    }
}

fn be_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(buf[offset..offset + 4].try_into().expect("4 bytes"))
}

fn be_i32(buf: &[u8], offset: usize) -> i32 {
    i32::from_be_bytes(buf[offset..offset + 4].try_into().expect("4 bytes"))
}

fn be_i64(buf: &[u8], offset: usize) -> i64 {
    i64::from_be_bytes(buf[offset..offset + 8].try_into().expect("8 bytes"))
}

async fn write_bool_response(socket: &mut TcpStream, msg_type: u32, success: bool, message: &str) -> Result<()> {
    let (tail, trailing) = protocol::bool_response(success, message);
    protocol::write_response(socket, msg_type, &tail, &trailing)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    Ok(())
}

async fn handle_download(socket: &mut TcpStream, downloader: &Arc<UsenetDownloader>, tail: &[u8]) -> Result<()> {
    let priority = be_i32(tail, 0);
    let category_len = be_u32(tail, 8) as usize;
    let name_len = be_u32(tail, 12) as usize;
    let content_len = be_u32(tail, 16) as usize;
    let trailing_len = pad4(category_len) + pad4(name_len) + pad4(content_len);

    let payload = protocol::read_trailing(socket, trailing_len)
        .await
        .map_err(std::io::Error::from)?;
    let mut cursor = 0;
    let category = take_string(&payload, &mut cursor, category_len);
    let name = take_string(&payload, &mut cursor, name_len);
    let content = payload[cursor..cursor + content_len].to_vec();

    let mut options = crate::types::DownloadOptions::default();
    options.priority = Priority::from_i32(priority);
    if !category.is_empty() {
        options.category = Some(category);
    }
    let download_name = if name.is_empty() { "download" } else { name.as_str() };

    let result = downloader.add_nzb_content(&content, download_name, options).await;
    match result {
        Ok(id) => write_bool_response(socket, RequestType::Download as u32, true, &format!("{}", id.get())).await,
        Err(e) => write_bool_response(socket, RequestType::Download as u32, false, &e.to_string()).await,
    }
}

async fn handle_pause_unpause(socket: &mut TcpStream, downloader: &Arc<UsenetDownloader>, tail: &[u8]) -> Result<()> {
    let pause = be_u32(tail, 0) != 0;
    let result = if pause {
        downloader.pause_all().await
    } else {
        downloader.resume_all().await
    };
    respond_bool(socket, RequestType::PauseUnpause as u32, result).await
}

async fn handle_list(socket: &mut TcpStream, downloader: &Arc<UsenetDownloader>) -> Result<()> {
    let downloads = downloader.db.list_downloads().await?;

    let mut entries = Vec::with_capacity(downloads.len());
    for d in &downloads {
        let mut entry = Vec::new();
        entry.extend_from_slice(&d.id.to_be_bytes());
        entry.extend_from_slice(&d.status.to_be_bytes());
        entry.extend_from_slice(&d.priority.to_be_bytes());
        entry.extend_from_slice(&d.size_bytes.to_be_bytes());
        entry.extend_from_slice(&d.downloaded_bytes.to_be_bytes());
        protocol::push_padded_string(&mut entry, &d.name);
        protocol::push_padded_string(&mut entry, d.category.as_deref().unwrap_or(""));
        entries.push(entry);
    }

    write_entry_list(socket, RequestType::List as u32, &entries).await
}

async fn handle_set_download_rate(
    socket: &mut TcpStream,
    downloader: &Arc<UsenetDownloader>,
    tail: &[u8],
) -> Result<()> {
    let rate_bps = be_u32(tail, 0);
    let limit = if rate_bps == 0 { None } else { Some(rate_bps as u64) };
    downloader.set_speed_limit(limit).await;
    write_bool_response(socket, RequestType::SetDownloadRate as u32, true, "").await
}

async fn handle_dump_debug(socket: &mut TcpStream, downloader: &Arc<UsenetDownloader>) -> Result<()> {
    let caps = downloader.capabilities();
    let message = format!(
        "parity handler={} can_verify={} can_repair={}",
        caps.parity.handler, caps.parity.can_verify, caps.parity.can_repair
    );
    write_bool_response(socket, RequestType::DumpDebug as u32, true, &message).await
}

async fn handle_edit_queue(socket: &mut TcpStream, downloader: &Arc<UsenetDownloader>, tail: &[u8]) -> Result<()> {
    let action_code = be_u32(tail, 0);
    let offset = be_i32(tail, 4);
    let priority = be_i32(tail, 8);
    let smart_order = be_u32(tail, 12) != 0;
    let id_count = be_u32(tail, 16) as usize;
    let text_len = be_u32(tail, 20) as usize;

    let trailing_len = id_count * 8 + pad4(text_len);
    let payload = protocol::read_trailing(socket, trailing_len)
        .await
        .map_err(std::io::Error::from)?;

    let mut ids = Vec::with_capacity(id_count);
    for i in 0..id_count {
        ids.push(DownloadId::new(be_i64(&payload, i * 8)));
    }
    let mut cursor = id_count * 8;
    let text = take_string(&payload, &mut cursor, text_len);

    let Some(action) = decode_queue_action(action_code, offset, priority, &text) else {
        return write_bool_response(socket, RequestType::EditQueue as u32, false, "unknown queue-edit action").await;
    };

    let result = downloader
        .edit_queue(QueueEditRequest {
            ids,
            action,
            smart_order,
        })
        .await;
    respond_bool(socket, RequestType::EditQueue as u32, result).await
}

fn decode_queue_action(code: u32, offset: i32, priority: i32, text: &str) -> Option<QueueEditAction> {
    Some(match code {
        0 => QueueEditAction::MoveOffset(offset as i64),
        1 => QueueEditAction::MoveTop,
        2 => QueueEditAction::MoveBottom,
        3 => QueueEditAction::Pause,
        4 => QueueEditAction::Resume,
        5 => QueueEditAction::Delete,
        6 => QueueEditAction::SetPriority(Priority::from_i32(priority)),
        7 => QueueEditAction::PostMove(offset as i64),
        8 => QueueEditAction::PostPause,
        9 => QueueEditAction::PostResume,
        10 => QueueEditAction::PostDelete,
        11 => QueueEditAction::SetCategory(if text.is_empty() { None } else { Some(text.to_string()) }),
        12 => QueueEditAction::SetName(text.to_string()),
        13 => QueueEditAction::SetDupeKey(if text.is_empty() { None } else { Some(text.to_string()) }),
        _ => return None,
    })
}

async fn handle_log(socket: &mut TcpStream, downloader: &Arc<UsenetDownloader>, tail: &[u8]) -> Result<()> {
    let lines_requested = be_u32(tail, 0) as usize;
    let messages = downloader.messages.recent(lines_requested).await;

    let mut entries = Vec::with_capacity(messages.len());
    for m in &messages {
        let mut entry = Vec::new();
        entry.extend_from_slice(&m.id.to_be_bytes());
        entry.extend_from_slice(&m.download_id.0.to_be_bytes());
        entry.extend_from_slice(&message_kind_code(m.kind).to_be_bytes());
        entry.extend_from_slice(&m.timestamp.to_be_bytes());
        protocol::push_padded_string(&mut entry, &m.text);
        entries.push(entry);
    }

    write_entry_list(socket, RequestType::Log as u32, &entries).await
}

fn message_kind_code(kind: crate::downloader::messages::MessageKind) -> u32 {
    use crate::downloader::messages::MessageKind;
    match kind {
        MessageKind::Info => 0,
        MessageKind::Warning => 1,
        MessageKind::Error => 2,
        MessageKind::Detail => 3,
    }
}

async fn handle_shutdown(socket: &mut TcpStream) -> Result<()> {
    write_bool_response(socket, RequestType::Shutdown as u32, true, "shutting down").await?;
    tracing::info!("RPC client requested shutdown");
    Ok(())
}

async fn handle_version(socket: &mut TcpStream) -> Result<()> {
    write_bool_response(socket, RequestType::Version as u32, true, env!("CARGO_PKG_VERSION")).await
}

async fn handle_post_queue(socket: &mut TcpStream, downloader: &Arc<UsenetDownloader>) -> Result<()> {
    let downloads = downloader
        .db
        .list_downloads_by_status(crate::types::Status::Processing.to_i32())
        .await?;

    let mut entries = Vec::with_capacity(downloads.len());
    for d in &downloads {
        let mut entry = Vec::new();
        entry.extend_from_slice(&d.id.to_be_bytes());
        entry.extend_from_slice(&d.post_stage.to_be_bytes());
        entry.extend_from_slice(&(d.post_paused as u32).to_be_bytes());
        protocol::push_padded_string(&mut entry, &d.name);
        entries.push(entry);
    }

    write_entry_list(socket, RequestType::PostQueue as u32, &entries).await
}

async fn handle_write_log(socket: &mut TcpStream, tail: &[u8]) -> Result<()> {
    let kind = be_u32(tail, 0);
    let text_len = be_u32(tail, 4) as usize;
    let payload = protocol::read_trailing(socket, pad4(text_len))
        .await
        .map_err(std::io::Error::from)?;
    let mut cursor = 0;
    let text = take_string(&payload, &mut cursor, text_len);

    match kind {
        0 => tracing::info!(source = "rpc-client", "{}", text),
        1 => tracing::warn!(source = "rpc-client", "{}", text),
        2 => tracing::error!(source = "rpc-client", "{}", text),
        _ => tracing::debug!(source = "rpc-client", "{}", text),
    }

    write_bool_response(socket, RequestType::WriteLog as u32, true, "").await
}

async fn handle_scan(socket: &mut TcpStream) -> Result<()> {
    // Folder-watch rescans on its own timer; there is no on-demand trigger
    // to call into yet, so acknowledge the request without effect.
    write_bool_response(socket, RequestType::Scan as u32, true, "scan not supported").await
}

async fn handle_pause_unpause_post_processor(
    socket: &mut TcpStream,
    downloader: &Arc<UsenetDownloader>,
    tail: &[u8],
) -> Result<()> {
    let pause = be_u32(tail, 0) != 0;
    let downloads = downloader
        .db
        .list_downloads_by_status(crate::types::Status::Processing.to_i32())
        .await?;

    let mut last_err = None;
    for d in &downloads {
        let action = if pause {
            QueueEditAction::PostPause
        } else {
            QueueEditAction::PostResume
        };
        if let Err(e) = downloader
            .edit_queue(QueueEditRequest {
                ids: vec![DownloadId::new(d.id)],
                action,
                smart_order: false,
            })
            .await
        {
            last_err = Some(e);
        }
    }

    match last_err {
        Some(e) => write_bool_response(socket, RequestType::PauseUnpausePostProcessor as u32, false, &e.to_string()).await,
        None => write_bool_response(socket, RequestType::PauseUnpausePostProcessor as u32, true, "").await,
    }
}

async fn handle_history(socket: &mut TcpStream, downloader: &Arc<UsenetDownloader>, tail: &[u8]) -> Result<()> {
    let status_filter = be_i32(tail, 0);
    let limit = be_u32(tail, 4) as usize;
    let offset = be_u32(tail, 8) as usize;

    let filter = if status_filter < 0 { None } else { Some(status_filter) };
    let entries_db = downloader.db.query_history(filter, limit, offset).await?;

    let mut entries = Vec::with_capacity(entries_db.len());
    for h in &entries_db {
        let mut entry = Vec::new();
        entry.extend_from_slice(&h.id.to_be_bytes());
        entry.extend_from_slice(&h.status.to_i32().to_be_bytes());
        entry.extend_from_slice(&h.size_bytes.to_be_bytes());
        entry.extend_from_slice(&(h.download_time.as_secs()).to_be_bytes());
        protocol::push_padded_string(&mut entry, &h.name);
        protocol::push_padded_string(&mut entry, h.category.as_deref().unwrap_or(""));
        entries.push(entry);
    }

    write_entry_list(socket, RequestType::History as u32, &entries).await
}

async fn respond_bool(socket: &mut TcpStream, msg_type: u32, result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => write_bool_response(socket, msg_type, true, "").await,
        Err(e) => write_bool_response(socket, msg_type, false, &e.to_string()).await,
    }
}

/// Write a list-style response: `{header, entry_size, entry_count, trailing_data_length}`
/// followed by `entries` laid back-to-back. `entry_size` is the padded size of
/// the largest entry; shorter entries are zero-padded to match so every entry
/// starts at a fixed stride (the rest of an undersized entry reads as trailing nulls).
async fn write_entry_list(socket: &mut TcpStream, msg_type: u32, entries: &[Vec<u8>]) -> Result<()> {
    let entry_size = entries.iter().map(Vec::len).max().unwrap_or(0);
    let mut trailing = Vec::with_capacity(entry_size * entries.len());
    for entry in entries {
        trailing.extend_from_slice(entry);
        trailing.resize(trailing.len() + (entry_size - entry.len()), 0);
    }

    let mut tail = Vec::with_capacity(12);
    tail.extend_from_slice(&(entry_size as u32).to_be_bytes());
    tail.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    tail.extend_from_slice(&(trailing.len() as u32).to_be_bytes());

    protocol::write_response(socket, msg_type, &tail, &trailing)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    Ok(())
}

fn pad4(len: usize) -> usize {
    len + (4 - (len % 4)) % 4
}

fn take_string(buf: &[u8], cursor: &mut usize, len: usize) -> String {
    let s = String::from_utf8_lossy(&buf[*cursor..*cursor + len]).into_owned();
    *cursor += pad4(len);
    s
}

impl From<protocol::ProtocolError> for std::io::Error {
    fn from(e: protocol::ProtocolError) -> Self {
        match e {
            protocol::ProtocolError::Io(io) => io,
            other => std::io::Error::other(other.to_string()),
        }
    }
}
