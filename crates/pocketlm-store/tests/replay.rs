//! End-to-end flow: the session manager replaying history out of the
//! real JSON-backed store and persisting a generated response into it.

use std::sync::{Arc, Mutex};

use tempfile::tempdir;

use pocketlm_llm::{
    CancelToken, EngineError, EngineLoader, EngineParams, Fragment, GenerationOutcome,
    InferenceEngine, Role, SessionManager,
};
use pocketlm_store::{Chat, ChatStore};

struct ScriptedEngine {
    appends: Arc<Mutex<Vec<(Role, String)>>>,
    fragments: Vec<Fragment>,
    next: usize,
}

impl InferenceEngine for ScriptedEngine {
    fn append_message(&mut self, role: Role, text: &str) -> Result<(), EngineError> {
        self.appends.lock().unwrap().push((role, text.to_string()));
        Ok(())
    }

    fn begin_completion(&mut self, _prompt: &str) -> Result<(), EngineError> {
        self.next = 0;
        Ok(())
    }

    fn next_fragment(&mut self) -> Result<Fragment, EngineError> {
        let fragment = self
            .fragments
            .get(self.next)
            .cloned()
            .unwrap_or(Fragment::Eog);
        self.next += 1;
        Ok(fragment)
    }

    fn end_completion(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    fn generation_speed(&self) -> f32 {
        12.0
    }

    fn context_tokens_used(&self) -> u32 {
        64
    }
}

struct ScriptedLoader {
    appends: Arc<Mutex<Vec<(Role, String)>>>,
    fragments: Vec<Fragment>,
}

impl EngineLoader for ScriptedLoader {
    fn open(&self, _params: &EngineParams) -> Result<Box<dyn InferenceEngine>, EngineError> {
        Ok(Box::new(ScriptedEngine {
            appends: Arc::clone(&self.appends),
            fragments: self.fragments.clone(),
            next: 0,
        }))
    }
}

#[tokio::test]
async fn send_message_flow_persists_through_the_store() {
    let dir = tempdir().unwrap();
    let store = Arc::new(ChatStore::open(dir.path().join("store.json")).unwrap());

    let mut chat = Chat::new("history");
    chat.system_prompt = "Be brief.".into();
    let chat = store.add_chat(chat).unwrap();
    store.add_user_message(&chat.id, "hello").unwrap();
    store.add_assistant_message(&chat.id, "hi").unwrap();

    let appends = Arc::new(Mutex::new(Vec::new()));
    let loader = Arc::new(ScriptedLoader {
        appends: Arc::clone(&appends),
        fragments: vec![
            Fragment::Text("wel".into()),
            Fragment::Text("come".into()),
            Fragment::Eog,
        ],
    });

    let mut manager = SessionManager::new(loader, Arc::clone(&store));
    manager
        .load(chat.session_config("/models/test.gguf"))
        .await
        .unwrap();

    {
        let appends = appends.lock().unwrap();
        assert_eq!(appends[0], (Role::System, "Be brief.".to_string()));
        assert_eq!(appends[1], (Role::User, "hello".to_string()));
        assert_eq!(appends[2], (Role::Assistant, "hi".to_string()));
    }

    // The orchestration layer persists the user's new message itself
    // before starting generation.
    store.add_user_message(&chat.id, "and you are?").unwrap();
    let outcome = manager
        .generate("and you are?", &CancelToken::new(), |_| {})
        .await
        .unwrap();
    assert!(matches!(outcome, GenerationOutcome::Done(_)));

    let messages = store.messages_for(&chat.id);
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[3].role, Role::Assistant);
    assert_eq!(messages[3].text, "welcome");
}
