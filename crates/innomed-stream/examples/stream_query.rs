use innomed_stream::observability::init_observability;
use innomed_stream::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ClientError> {
    init_observability("info");
    let (controller, mut observer) = HttpBackend::from_env()?.into_controller()?;
    controller.start(SessionRequest::new(
        "Aspirin",
        "What are the market opportunities for this molecule?",
    )?);

    let mut printed = 0;
    while let Some(update) = observer.next_update().await {
        match update {
            SessionUpdate::ModelChanged { model, .. } => {
                let tokens = model.token_buffer();
                print!("{}", &tokens[printed..]);
                printed = tokens.len();
            }
            SessionUpdate::Completed { model, .. } => {
                println!("\n{:#}", model.to_json());
                break;
            }
            SessionUpdate::Failed { failure, .. } => {
                eprintln!("session failed: {failure}");
                break;
            }
            SessionUpdate::Started { .. } => {}
        }
    }
    Ok(())
}
