use super::*;

use tempfile::tempdir;

fn store_in(dir: &tempfile::TempDir) -> ChatStore {
    ChatStore::open(dir.path().join("store.json")).unwrap()
}

#[test]
fn open_missing_file_starts_fresh() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    assert!(store.chats().is_empty());
    assert!(store.models().is_empty());
    assert!(store.tasks().is_empty());
}

#[test]
fn corrupt_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, "{not json").unwrap();
    let err = ChatStore::open(&path).unwrap_err();
    assert!(matches!(err, StoreError::Serde(_)));
}

#[test]
fn entities_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");

    let chat = {
        let store = ChatStore::open(&path).unwrap();
        let chat = store.add_chat(Chat::new("physics")).unwrap();
        store.add_user_message(&chat.id, "what is entropy?").unwrap();
        store
            .add_assistant_message(&chat.id, "a measure of disorder")
            .unwrap();
        store
            .add_model(ModelRecord::new("qwen", "", "/models/qwen.gguf"))
            .unwrap();
        store.add_task(Task::new("summarize", "Summarize.")).unwrap();
        chat
    };

    let store = ChatStore::open(&path).unwrap();
    assert_eq!(store.chats().len(), 1);
    assert_eq!(store.chats()[0].name, "physics");
    assert_eq!(store.messages_for(&chat.id).len(), 2);
    assert_eq!(store.models().len(), 1);
    assert_eq!(store.tasks().len(), 1);
}

#[test]
fn messages_keep_insertion_order() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let chat = store.add_chat(Chat::new("order")).unwrap();
    let other = store.add_chat(Chat::new("other")).unwrap();

    store.add_user_message(&chat.id, "first").unwrap();
    store.add_user_message(&other.id, "elsewhere").unwrap();
    store.add_assistant_message(&chat.id, "second").unwrap();
    store.add_user_message(&chat.id, "third").unwrap();

    let texts: Vec<String> = store
        .messages_for(&chat.id)
        .into_iter()
        .map(|m| m.text)
        .collect();
    assert_eq!(texts, vec!["first", "second", "third"]);
}

#[test]
fn turns_for_maps_roles_in_order() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let chat = store.add_chat(Chat::new("replay")).unwrap();
    store.add_user_message(&chat.id, "hi").unwrap();
    store.add_assistant_message(&chat.id, "hello").unwrap();

    let turns = store.turns_for(&chat.id).unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].text, "hi");
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[1].text, "hello");
}

#[test]
fn append_assistant_turn_persists_a_message() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let chat = store.add_chat(Chat::new("gen")).unwrap();

    store.append_assistant_turn(&chat.id, "generated").unwrap();

    let messages = store.messages_for(&chat.id);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::Assistant);
    assert_eq!(messages[0].text, "generated");
}

#[test]
fn delete_chat_cascades_to_messages() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let chat = store.add_chat(Chat::new("doomed")).unwrap();
    let kept = store.add_chat(Chat::new("kept")).unwrap();
    store.add_user_message(&chat.id, "bye").unwrap();
    store.add_user_message(&kept.id, "stay").unwrap();

    store.delete_chat(&chat.id).unwrap();

    assert_eq!(store.chats().len(), 1);
    assert!(store.messages_for(&chat.id).is_empty());
    assert_eq!(store.messages_for(&kept.id).len(), 1);
}

#[test]
fn delete_messages_keeps_the_chat() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let chat = store.add_chat(Chat::new("cleared")).unwrap();
    store.add_user_message(&chat.id, "one").unwrap();

    store.delete_messages(&chat.id).unwrap();

    assert!(store.messages_for(&chat.id).is_empty());
    assert!(store.chat(&chat.id).is_some());
}

#[test]
fn default_chat_creates_one_untitled_chat() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);

    let first = store.default_chat().unwrap();
    assert_eq!(first.name, "Untitled");
    let second = store.default_chat().unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(store.chats().len(), 1);
}

#[test]
fn mark_used_reorders_chats() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let older = store.add_chat(Chat::new("older")).unwrap();
    let _newer = store.add_chat(Chat::new("newer")).unwrap();

    store.mark_used(&older.id).unwrap();

    assert_eq!(store.recently_used_chat().unwrap().id, older.id);
}

#[test]
fn update_chat_requires_existing_chat() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let ghost = Chat::new("ghost");
    let err = store.update_chat(&ghost).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test]
fn delete_model_resets_chat_references() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let model = store
        .add_model(ModelRecord::new("qwen", "", "/models/qwen.gguf"))
        .unwrap();
    let mut chat = store.add_chat(Chat::new("uses model")).unwrap();
    chat.model_id = Some(model.id.clone());
    store.update_chat(&chat).unwrap();

    store.delete_model(&model.id).unwrap();

    assert!(store.models().is_empty());
    assert!(store.chat(&chat.id).unwrap().model_id.is_none());
}

#[test]
fn tasks_round_trip() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let mut task = store
        .add_task(Task::new("translate", "Translate to French."))
        .unwrap();

    task.name = "translate (fr)".into();
    store.update_task(&task).unwrap();
    assert_eq!(store.tasks()[0].name, "translate (fr)");

    store.delete_task(&task.id).unwrap();
    assert!(store.tasks().is_empty());
}
