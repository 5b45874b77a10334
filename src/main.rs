use folder_vault::services::{ListingService, MutationService, SessionService, TreeService};
use folder_vault::{AppState, ClientConfig, ImageBlob};
use std::path::Path;

const USAGE: &str = "\
usage: folder-vault <command> [args]

  whoami                          show the identity in the stored token
  token <jwt>                     store a token issued by the login service
  logout                          end the session and forget the token
  tree                            print the folder tree
  images [folder|-] [search]      list images, '-' for all folders
  mkdir <name> [parent]           create a folder
  rename <id> <name>              rename a folder
  rmdir <id>                      delete a folder
  upload <file> <folder> [name]   upload an image into a folder
  rm <image-id>                   delete an image";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(debug_assertions)]
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .init();
    #[cfg(not(debug_assertions))]
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let state = AppState::connect(ClientConfig::from_env())?;
    async_std::task::block_on(run(&state, command, rest))?;
    Ok(())
}

async fn run(state: &AppState, command: &str, args: &[String]) -> folder_vault::Result<()> {
    let arg = |i: usize| args.get(i).map(String::as_str);

    match (command, arg(0), arg(1)) {
        ("whoami", _, _) => match SessionService::new(state).identity() {
            Some(identity) => println!("{} <{}> ({})", identity.name, identity.email, identity.id),
            None => println!("not signed in"),
        },
        ("token", Some(token), _) => {
            let session = SessionService::new(state);
            session.set_credential(token)?;
            if !session.is_authenticated() {
                println!("token could not be decoded and was discarded");
            }
        }
        ("logout", _, _) => SessionService::new(state).logout().await?,
        ("tree", _, _) => {
            let tree = TreeService::new(state);
            tree.snapshot().await?;
            loop {
                let collapsed: Vec<String> = tree
                    .visible_rows()
                    .into_iter()
                    .filter(|row| row.has_children && !row.expanded)
                    .map(|row| row.id)
                    .collect();
                if collapsed.is_empty() {
                    break;
                }
                for id in collapsed {
                    tree.toggle_expansion(&id);
                }
            }
            for row in tree.visible_rows() {
                println!("{}{}  [{}]", "  ".repeat(row.depth), row.name, row.id);
            }
        }
        ("images", folder, search) => {
            let listing = ListingService::new(state);
            listing.select(folder.filter(|f| *f != "-"), None);
            listing.set_search_term(search.unwrap_or_default());
            for image in listing.images().await?.iter() {
                println!("{}  {}  {}", image.id, image.name, image.image_url);
            }
        }
        ("mkdir", Some(name), parent) => {
            let folder = MutationService::new(state).create_folder(name, parent).await?;
            println!("created {} [{}]", folder.name, folder.id);
        }
        ("rename", Some(id), Some(name)) => {
            let folder = MutationService::new(state).rename_folder(id, name).await?;
            println!("renamed {} to {}", folder.id, folder.name);
        }
        ("rmdir", Some(id), _) => {
            MutationService::new(state).delete_folder(id).await?;
            println!("deleted folder {}", id);
        }
        ("upload", Some(file), Some(folder)) => {
            let path = Path::new(file);
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.to_string());
            let name = match arg(2) {
                Some(name) => name.to_string(),
                None => path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file_name.clone()),
            };
            let blob = ImageBlob::new(file_name, std::fs::read(path)?);
            let image = MutationService::new(state)
                .upload_image(&name, Some(folder), blob)
                .await?;
            println!("uploaded {} [{}] {}", image.name, image.id, image.image_url);
        }
        ("rm", Some(id), _) => {
            MutationService::new(state).delete_image(id).await?;
            println!("deleted image {}", id);
        }
        _ => println!("{}", USAGE),
    }
    Ok(())
}

