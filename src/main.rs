#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod error;
mod history;
mod llm;
mod order;
mod settings;
mod storage;
mod window;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use tauri::State;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use error::AppError;
use history::{Chat, ChatMessage, Role};
use llm::LlmClient;
use order::{ChatOrder, MoveDirection};
use settings::{Settings, SettingsStore};
use storage::ChatStore;

// --- Filesystem layout ---

struct AppPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl AppPaths {
    fn resolve() -> Self {
        let config_dir = dirs_next::config_dir()
            .expect("Failed to find config directory")
            .join("QuantumChat");
        let data_dir = dirs_next::data_dir()
            .expect("Failed to find data directory")
            .join("QuantumChat")
            .join("data");
        Self {
            config_dir,
            data_dir,
        }
    }

    fn settings_file(&self) -> PathBuf {
        self.config_dir.join(settings::SETTINGS_FILE)
    }

    fn order_file(&self) -> PathBuf {
        self.data_dir.join(order::ORDER_FILE)
    }

    fn chats_dir(&self) -> PathBuf {
        self.data_dir.join(storage::CHATS_DIR)
    }

    fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

// --- Application State ---

struct AppState {
    settings_store: SettingsStore,
    settings: Mutex<Settings>,
    store: ChatStore,
    chats: Mutex<HashMap<String, Chat>>,
    order: Mutex<ChatOrder>,
    llm: tokio::sync::Mutex<LlmClient>,
    in_flight: Mutex<HashMap<String, CancellationToken>>,
}

/// Claims the single in-flight-request slot for `chat_id`.
fn claim_slot(state: &AppState, chat_id: &str) -> Result<CancellationToken, AppError> {
    let mut in_flight = state.in_flight.lock().unwrap();
    if in_flight.contains_key(chat_id) {
        return Err(AppError::Busy);
    }
    let token = CancellationToken::new();
    in_flight.insert(chat_id.to_string(), token.clone());
    Ok(token)
}

fn release_slot(state: &AppState, chat_id: &str) {
    state.in_flight.lock().unwrap().remove(chat_id);
}

/// Append the user message, run the model call under the cancellation token,
/// then append and persist the assistant reply.
async fn generate_reply(
    state: &AppState,
    chat_id: &str,
    text: &str,
    token: &CancellationToken,
) -> Result<ChatMessage, AppError> {
    {
        let mut chats = state.chats.lock().unwrap();
        let chat = chats
            .get_mut(chat_id)
            .ok_or_else(|| AppError::ChatNotFound(chat_id.to_string()))?;
        chat.push(Role::User, text);
        state.store.save(chat)?;
    }

    let reply = {
        let mut llm = state.llm.lock().await;
        tokio::select! {
            _ = token.cancelled() => return Err(AppError::Cancelled),
            reply = llm.generate(text) => reply?,
        }
    };

    // The chat may have been deleted while the request was in flight.
    let mut chats = state.chats.lock().unwrap();
    let chat = chats
        .get_mut(chat_id)
        .ok_or_else(|| AppError::ChatNotFound(chat_id.to_string()))?;
    let message = chat.push(Role::Assistant, reply);
    state.store.save(chat)?;
    Ok(message)
}

// --- Chat Commands ---

#[tauri::command]
fn list_chats(state: State<'_, AppState>) -> Result<Vec<Chat>, String> {
    let order = state.order.lock().unwrap();
    let chats = state.chats.lock().unwrap();
    let list = order
        .ordered()
        .iter()
        .filter_map(|id| chats.get(id).cloned())
        .collect();
    Ok(list)
}

#[tauri::command]
fn create_chat(state: State<'_, AppState>) -> Result<Chat, String> {
    let chat = Chat::new("New Chat");
    state.store.save(&chat).map_err(|e| e.to_string())?;
    state
        .order
        .lock()
        .unwrap()
        .add(&chat.id)
        .map_err(|e| e.to_string())?;
    state
        .chats
        .lock()
        .unwrap()
        .insert(chat.id.clone(), chat.clone());
    info!(chat_id = %chat.id, "created chat");
    Ok(chat)
}

#[tauri::command]
fn select_chat(chat_id: String, state: State<'_, AppState>) -> Result<Chat, String> {
    let chats = state.chats.lock().unwrap();
    chats
        .get(&chat_id)
        .cloned()
        .ok_or_else(|| AppError::ChatNotFound(chat_id).to_string())
}

#[tauri::command]
fn rename_chat(
    chat_id: String,
    new_name: String,
    state: State<'_, AppState>,
) -> Result<Chat, String> {
    let name = new_name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("name is empty".to_string()).to_string());
    }
    let mut chats = state.chats.lock().unwrap();
    let chat = chats
        .get_mut(&chat_id)
        .ok_or_else(|| AppError::ChatNotFound(chat_id.clone()).to_string())?;
    chat.name = name.to_string();
    state.store.save(chat).map_err(|e| e.to_string())?;
    Ok(chat.clone())
}

#[tauri::command]
fn delete_chat(chat_id: String, state: State<'_, AppState>) -> Result<(), String> {
    // Abort any generation still running against this chat.
    if let Some(token) = state.in_flight.lock().unwrap().get(&chat_id) {
        token.cancel();
    }
    state.store.delete(&chat_id).map_err(|e| e.to_string())?;
    state
        .order
        .lock()
        .unwrap()
        .remove(&chat_id)
        .map_err(|e| e.to_string())?;
    state.chats.lock().unwrap().remove(&chat_id);
    info!(chat_id = %chat_id, "deleted chat");
    Ok(())
}

#[tauri::command]
fn toggle_favorite(chat_id: String, state: State<'_, AppState>) -> Result<bool, String> {
    let is_favorite = state
        .order
        .lock()
        .unwrap()
        .toggle_favorite(&chat_id)
        .map_err(|e| e.to_string())?;
    let mut chats = state.chats.lock().unwrap();
    if let Some(chat) = chats.get_mut(&chat_id) {
        chat.is_favorite = is_favorite;
        state.store.save(chat).map_err(|e| e.to_string())?;
    }
    Ok(is_favorite)
}

#[tauri::command]
fn move_chat(
    chat_id: String,
    direction: MoveDirection,
    state: State<'_, AppState>,
) -> Result<(), String> {
    state
        .order
        .lock()
        .unwrap()
        .move_chat(&chat_id, direction)
        .map_err(|e| e.to_string())
}

// --- Message Commands ---

#[tauri::command]
async fn send_message(
    chat_id: String,
    message: String,
    state: State<'_, AppState>,
) -> Result<ChatMessage, String> {
    let text = message.trim().to_string();
    if text.is_empty() {
        return Err(AppError::InvalidInput("message is empty".to_string()).to_string());
    }
    let token = claim_slot(state.inner(), &chat_id).map_err(|e| e.to_string())?;
    let result = generate_reply(state.inner(), &chat_id, &text, &token).await;
    release_slot(state.inner(), &chat_id);
    if let Err(e) = &result {
        error!(chat_id = %chat_id, "failed to generate response: {e}");
    }
    result.map_err(|e| e.to_string())
}

#[tauri::command]
fn cancel_generation(chat_id: String, state: State<'_, AppState>) -> Result<(), String> {
    if let Some(token) = state.in_flight.lock().unwrap().get(&chat_id) {
        token.cancel();
        info!(chat_id = %chat_id, "cancelled generation");
    }
    Ok(())
}

#[tauri::command]
async fn clear_model_history(state: State<'_, AppState>) -> Result<(), String> {
    state.llm.lock().await.clear_history();
    Ok(())
}

// --- Settings Commands ---

#[tauri::command]
fn get_settings(state: State<'_, AppState>) -> Result<Settings, String> {
    Ok(state.settings.lock().unwrap().clone())
}

#[tauri::command]
fn validate_settings(settings: Settings) -> Result<bool, String> {
    Ok(settings::validate(&settings))
}

#[tauri::command]
async fn update_settings(
    settings: Settings,
    state: State<'_, AppState>,
) -> Result<(), String> {
    state
        .settings_store
        .save(&settings)
        .map_err(|e| e.to_string())?;
    *state.settings.lock().unwrap() = settings.clone();
    // Rebuild the model client with the new parameters; history is kept.
    state.llm.lock().await.update_settings(&settings);
    Ok(())
}

#[tauri::command]
fn open_settings_file(state: State<'_, AppState>) -> Result<(), String> {
    opener::open(state.settings_store.path())
        .map_err(|e| format!("Failed to open settings file: {e}"))
}

// --- Bootstrap ---

fn init_tracing(log_dir: &std::path::Path) -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::never(log_dir, "quantum-chat.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();
    guard
}

fn main() {
    let paths = AppPaths::resolve();
    std::fs::create_dir_all(paths.log_dir()).expect("Failed to create log directory");
    let _log_guard = init_tracing(&paths.log_dir());

    let settings_store = SettingsStore::new(paths.settings_file());
    let loaded_settings = settings_store.load();
    let store = ChatStore::new(paths.chats_dir()).expect("Failed to create chat directory");
    let chats = store.load_all().unwrap_or_else(|e| {
        error!("failed to load chats: {e}");
        HashMap::new()
    });
    let chat_order = ChatOrder::load(paths.order_file());
    let llm = LlmClient::new(&loaded_settings);
    info!(chats = chats.len(), "starting Quantum Chat");

    tauri::Builder::default()
        .manage(AppState {
            settings_store,
            settings: Mutex::new(loaded_settings),
            store,
            chats: Mutex::new(chats),
            order: Mutex::new(chat_order),
            llm: tokio::sync::Mutex::new(llm),
            in_flight: Mutex::new(HashMap::new()),
        })
        .invoke_handler(tauri::generate_handler![
            // Chats
            list_chats,
            create_chat,
            select_chat,
            rename_chat,
            delete_chat,
            toggle_favorite,
            move_chat,
            // Messages
            send_message,
            cancel_generation,
            clear_model_history,
            // Settings
            get_settings,
            validate_settings,
            update_settings,
            open_settings_file
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
