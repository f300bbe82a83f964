use std::path::PathBuf;

use clap::Parser;

use medio::{
    Backend, DType, ReadOptions, Result, SaveDirOptions, SaveOptions, read_img, save_dir, save_img,
};

#[derive(Parser, Debug)]
#[command(
    name = "medio",
    version,
    about = "Convert medical images between NIfTI, raster formats and DICOM series"
)]
struct Cli {
    /// Image file or DICOM directory to read
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// File to write, or directory with --dicom-dir
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Reorient after reading, ITK convention (e.g. RAI)
    #[arg(long, value_name = "CODE")]
    ornt: Option<String>,

    /// Read backend: nib, itk, pdcm or pydicom
    #[arg(long, value_name = "TOKEN")]
    backend: Option<String>,

    /// Cast to this type before writing (e.g. uint8, int16, float32)
    #[arg(long, value_name = "NAME")]
    dtype: Option<String>,

    /// Write a DICOM series into OUTPUT
    #[arg(long = "dicom-dir")]
    dicom_dir: bool,

    /// Create missing parent directories of OUTPUT
    #[arg(long)]
    parents: bool,

    /// Keep the orientation after --ornt instead of restoring the original one
    #[arg(long = "keep-ornt")]
    keep_ornt: bool,

    /// The input has a channel axis (RGB images, vector volumes)
    #[arg(long)]
    channels: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let mut read_options = ReadOptions::new();
    if let Some(token) = &cli.backend {
        read_options = read_options.backend(token.parse::<Backend>()?);
    }
    if let Some(code) = &cli.ornt {
        read_options = read_options.desired_ornt(code);
    }
    let dtype = cli.dtype.as_deref().map(str::parse::<DType>).transpose()?;

    let (image, metadata) = read_img(&cli.input, &read_options)?;
    log::info!(
        "read {} with shape {:?} ({})",
        cli.input.display(),
        image.shape(),
        image.dtype()
    );
    // reads put channels last
    let channels_axis = cli.channels.then_some(-1);

    if cli.dicom_dir {
        let mut options = SaveDirOptions::new()
            .use_original_ornt(!cli.keep_ornt)
            .channels_axis(channels_axis)
            .parents(cli.parents);
        if let Some(dtype) = dtype {
            options = options.dtype(dtype);
        }
        save_dir(&cli.output, image, &metadata, &options)?;
    } else {
        let mut options = SaveOptions::new()
            .use_original_ornt(!cli.keep_ornt)
            .channels_axis(channels_axis)
            .mkdir(cli.parents, cli.parents);
        if let Some(dtype) = dtype {
            options = options.dtype(dtype);
        }
        save_img(&cli.output, image, &metadata, &options)?;
    }
    Ok(())
}
