use devnet_blockchain_api::{Block, Blockchain as _, BlockchainError, Header};
use devnet_blockchain_local::LocalBlockchain;
use devnet_primitives::{Address, B256};
use devnet_test_utils::transaction::dummy_transaction;
use devnet_transaction::ExecutableTransaction as _;

const GAS_LIMIT: u64 = 30_000_000;

fn genesis_block() -> Block {
    Block::new(Header::new(B256::ZERO, 0, 0, Address::ZERO, GAS_LIMIT), Vec::new())
}

fn next_block(blockchain: &LocalBlockchain, nonce: u64) -> anyhow::Result<Block> {
    let last = blockchain.last_block()?;

    Ok(Block::new(
        Header::new(
            *last.hash(),
            last.number() + 1,
            last.header().timestamp + 1,
            Address::ZERO,
            GAS_LIMIT,
        ),
        vec![dummy_transaction(nonce)],
    ))
}

#[test]
fn starts_at_genesis() -> anyhow::Result<()> {
    let genesis = genesis_block();
    let blockchain = LocalBlockchain::new(genesis.clone(), 31_337)?;

    assert_eq!(blockchain.chain_id(), 31_337);
    assert_eq!(blockchain.last_block_number(), 0);
    assert_eq!(*blockchain.last_block()?, genesis);
    assert_eq!(
        blockchain.block_by_hash(genesis.hash())?.as_deref(),
        Some(&genesis)
    );

    Ok(())
}

#[test]
fn rejects_non_genesis_block() {
    let block = Block::new(Header::new(B256::ZERO, 1, 0, Address::ZERO, GAS_LIMIT), Vec::new());

    assert!(matches!(
        LocalBlockchain::new(block, 1),
        Err(BlockchainError::InvalidBlockNumber {
            actual: 1,
            expected: 0
        })
    ));
}

#[test]
fn insert_and_lookup() -> anyhow::Result<()> {
    let mut blockchain = LocalBlockchain::new(genesis_block(), 1)?;

    let block = next_block(&blockchain, 0)?;
    let transaction = block.transactions()[0].clone();
    let inserted = blockchain.insert_block(block)?;

    assert_eq!(blockchain.last_block_number(), 1);
    assert_eq!(blockchain.block_by_number(1)?, Some(inserted.clone()));
    assert_eq!(
        blockchain.block_by_transaction_hash(transaction.transaction_hash())?,
        Some(inserted)
    );
    assert_eq!(
        blockchain.transaction_by_hash(transaction.transaction_hash())?,
        Some(transaction)
    );

    Ok(())
}

#[test]
fn rejects_invalid_next_block() -> anyhow::Result<()> {
    let mut blockchain = LocalBlockchain::new(genesis_block(), 1)?;

    let skipping = Block::new(
        Header::new(*blockchain.last_block()?.hash(), 2, 1, Address::ZERO, GAS_LIMIT),
        Vec::new(),
    );
    assert!(matches!(
        blockchain.insert_block(skipping),
        Err(BlockchainError::InvalidBlockNumber {
            actual: 2,
            expected: 1
        })
    ));

    let orphan = Block::new(
        Header::new(B256::repeat_byte(1), 1, 1, Address::ZERO, GAS_LIMIT),
        Vec::new(),
    );
    assert!(matches!(
        blockchain.insert_block(orphan),
        Err(BlockchainError::InvalidParentHash { .. })
    ));

    Ok(())
}

#[test]
fn revert_to_block() -> anyhow::Result<()> {
    let mut blockchain = LocalBlockchain::new(genesis_block(), 1)?;

    let first = next_block(&blockchain, 0)?;
    blockchain.insert_block(first)?;

    let second = next_block(&blockchain, 1)?;
    let transaction_hash = *second.transactions()[0].transaction_hash();
    blockchain.insert_block(second)?;

    blockchain.revert_to_block(1)?;

    assert_eq!(blockchain.last_block_number(), 1);
    assert_eq!(blockchain.block_by_number(2)?, None);
    assert_eq!(blockchain.transaction_by_hash(&transaction_hash)?, None);

    assert!(matches!(
        blockchain.revert_to_block(5),
        Err(BlockchainError::UnknownBlockNumber)
    ));

    Ok(())
}
