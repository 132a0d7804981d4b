use anyhow::Result;
use log::info;

use wallet_relay::blockchain::{Blockchain, Transaction, Wallet};
use wallet_relay::logging;

// Builds a short chain locally and logs it block by block
fn main() -> Result<()> {
    logging::init("Blockchain");

    let blockchain = Blockchain::new();
    info!("\n{}", blockchain);

    let alice = Wallet::new();
    let bob = Wallet::new();

    let transaction = Transaction::new(alice.address().clone(), bob.address().clone(), 1.0)?;
    let signed = alice.sign_transaction(transaction)?;
    blockchain.add_signed_transaction(signed)?;

    let previous_hash = blockchain.last_block()?.hash();
    blockchain.create_block(5, previous_hash)?;
    info!("\n{}", blockchain);

    let previous_hash = blockchain.last_block()?.hash();
    blockchain.create_block(2, previous_hash)?;
    info!("\n{}", blockchain);

    info!("Chain of {} blocks valid: {}", blockchain.len(), blockchain.is_valid());
    Ok(())
}
