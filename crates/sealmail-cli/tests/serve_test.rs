//! The accept loop over real TCP sockets.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sealmail_core::MailStore;
use sealmail_crypto::{CryptoError, CryptoResult, KeyResolver, Keypair, PrivateKey, PublicKey};
use sealmail_db::MemoryMailStore;
use sealmail_protocol::{
    Command, ListOutcome, Presentation, ProcessorSettings, Request, RetrieveOutcome, SealKeys,
    SendOutcome, Session,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

struct Keys(HashMap<PathBuf, Keypair>);

impl KeyResolver for Keys {
    fn resolve_public(&self, path: &Path) -> CryptoResult<PublicKey> {
        self.0
            .get(path)
            .map(|k| k.public.clone())
            .ok_or_else(|| CryptoError::KeyNotFound(path.to_path_buf()))
    }

    fn resolve_private(&self, path: &Path, _password: Option<&str>) -> CryptoResult<PrivateKey> {
        self.0
            .get(path)
            .map(|k| k.private.clone())
            .ok_or_else(|| CryptoError::KeyNotFound(path.to_path_buf()))
    }
}

async fn start() -> (String, Arc<MemoryMailStore>, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let store = Arc::new(MemoryMailStore::new());
    let (stop, stopped) = oneshot::channel::<()>();

    let served: Arc<dyn MailStore> = store.clone();
    tokio::spawn(async move {
        sealmail_cli::serve(listener, served, ProcessorSettings::default(), async {
            stopped.await.ok();
        })
        .await
        .unwrap();
    });
    (address, store, stop)
}

#[tokio::test]
async fn test_two_clients_exchange_sealed_mail() {
    let (address, store, stop) = start().await;
    let keys = Arc::new(Keys(
        [("alice", Keypair::generate()), ("bob", Keypair::generate())]
            .into_iter()
            .map(|(name, kp)| (PathBuf::from(name), kp))
            .collect(),
    ));

    let mut alice = Session::new(TcpStream::connect(&address).await.unwrap(), keys.clone());
    let mut bob = Session::new(TcpStream::connect(&address).await.unwrap(), keys.clone());

    for (command, arg) in [(Command::Helo, "alice"), (Command::Mail, "alice"), (Command::Rcpt, "bob")] {
        let response = alice.execute(&Request::with_argument(command, arg)).await.unwrap();
        assert!(response.is_success());
    }
    let sent = alice
        .send_secure(
            "See you at eight.",
            &SealKeys {
                recipient_public: "bob".into(),
                sender_private: "alice".into(),
                password: None,
            },
        )
        .await
        .unwrap();
    assert!(matches!(sent, SendOutcome::Acknowledged(ref r) if r.is_success()));
    assert_eq!(store.len().await, 1);

    bob.execute(&Request::with_argument(Command::Helo, "bob"))
        .await
        .unwrap();
    let ListOutcome::Listed { summaries, .. } = bob.list().await.unwrap() else {
        panic!("list rejected");
    };
    let id = summaries.split(' ').next().unwrap().to_string();

    let outcome = bob
        .retrieve(&id, || {
            Some(sealmail_protocol::OpenKeys {
                sender_public: "alice".into(),
                recipient_private: "bob".into(),
                password: None,
            })
        })
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        RetrieveOutcome::Presented { presentation: Presentation::Decrypted(ref b), .. }
            if b == "See you at eight."
    ));

    stop.send(()).unwrap();
}

#[tokio::test]
async fn test_open_connections_survive_shutdown() {
    let (address, _store, stop) = start().await;
    let mut session = Session::new(
        TcpStream::connect(&address).await.unwrap(),
        Arc::new(Keys(HashMap::new())),
    );
    // Make sure the connection has been accepted before stopping.
    session
        .execute(&Request::with_argument(Command::Helo, "bob"))
        .await
        .unwrap();

    stop.send(()).unwrap();
    tokio::task::yield_now().await;

    let quit = session.execute(&Request::command(Command::Quit)).await.unwrap();
    assert!(quit.is_success());
}
